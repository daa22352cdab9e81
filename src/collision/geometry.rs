//! Pixel-space geometry: points, axis-aligned bounding boxes and the
//! segment/polyline intersection tests used for line-path obstacles.
//!
//! All coordinates are display pixels with y growing downward, so "up" is
//! the negative y direction.

use serde::{Deserialize, Serialize};

/// Tolerance used by overlap tests so that touching rectangles (and
/// rectangles separated by float noise) are not reported as overlapping.
pub const EPS: f64 = 1e-6;

/// A point in either data or pixel coordinates (the caller knows which).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned rectangle in display pixels.
///
/// Invariant: `x_min <= x_max` and `y_min <= y_max`; [`BBox::new`] normalizes
/// swapped corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x_min: x0.min(x1),
            y_min: y0.min(y1),
            x_max: x0.max(x1),
            y_max: y0.max(y1),
        }
    }

    /// Rectangle of the given size with its top-left corner at `origin`.
    pub fn from_origin(origin: Point, width: f64, height: f64) -> Self {
        Self::new(origin.x, origin.y, origin.x + width, origin.y + height)
    }

    /// Zero-sized rectangle at `p`.
    pub fn point(p: Point) -> Self {
        Self::new(p.x, p.y, p.x, p.y)
    }

    /// Smallest rectangle containing all points, `None` for an empty input.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        points.into_iter().fold(None, |acc: Option<BBox>, p| {
            let b = BBox::point(*p);
            Some(match acc {
                Some(a) => a.union(&b),
                None => b,
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.x_min + self.x_max) * 0.5,
            (self.y_min + self.y_max) * 0.5,
        )
    }

    /// Symmetric inflation by `pad` pixels on every side.
    pub fn pad(&self, pad: f64) -> Self {
        Self {
            x_min: self.x_min - pad,
            y_min: self.y_min - pad,
            x_max: self.x_max + pad,
            y_max: self.y_max + pad,
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x_min: self.x_min + dx,
            y_min: self.y_min + dy,
            x_max: self.x_max + dx,
            y_max: self.y_max + dy,
        }
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// True when the intersection has strictly positive area (beyond [`EPS`]).
    pub fn overlaps(&self, other: &BBox) -> bool {
        self.x_min < other.x_max - EPS
            && other.x_min < self.x_max - EPS
            && self.y_min < other.y_max - EPS
            && other.y_min < self.y_max - EPS
    }

    /// True when `other` lies entirely inside `self` (borders inclusive).
    pub fn contains(&self, other: &BBox) -> bool {
        other.x_min >= self.x_min - EPS
            && other.x_max <= self.x_max + EPS
            && other.y_min >= self.y_min - EPS
            && other.y_max <= self.y_max + EPS
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    fn interior_contains_point(&self, p: Point) -> bool {
        p.x > self.x_min + EPS
            && p.x < self.x_max - EPS
            && p.y > self.y_min + EPS
            && p.y < self.y_max - EPS
    }
}

/// Exact test: does segment `a`-`b` pass through the interior of `rect`?
///
/// Liang-Barsky clipping; a segment that only grazes the border does not
/// count, matching the strict [`BBox::overlaps`] convention.
pub fn segment_intersects_rect(a: Point, b: Point, rect: &BBox) -> bool {
    if a.x.max(b.x) <= rect.x_min + EPS
        || a.x.min(b.x) >= rect.x_max - EPS
        || a.y.max(b.y) <= rect.y_min + EPS
        || a.y.min(b.y) >= rect.y_max - EPS
    {
        return false;
    }
    if rect.interior_contains_point(a) || rect.interior_contains_point(b) {
        return true;
    }
    match clip_segment(a, b, rect) {
        Some((t0, t1)) => {
            // Segment inside the closed rect; reject pure border contact.
            let mid_t = (t0 + t1) * 0.5;
            let mid = Point::new(a.x + (b.x - a.x) * mid_t, a.y + (b.y - a.y) * mid_t);
            t1 - t0 > 0.0 && rect.interior_contains_point(mid)
        }
        None => false,
    }
}

/// Parameter interval `[t0, t1]` of segment `a`-`b` inside the closed `rect`.
fn clip_segment(a: Point, b: Point, rect: &BBox) -> Option<(f64, f64)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [
        (-dx, a.x - rect.x_min),
        (dx, rect.x_max - a.x),
        (-dy, a.y - rect.y_min),
        (dy, rect.y_max - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((t0, t1))
}

/// Exact continuous test of a polyline against a rectangle.
pub fn polyline_intersects_rect(points: &[Point], rect: &BBox) -> bool {
    match points {
        [] => false,
        [only] => rect.interior_contains_point(*only),
        _ => points
            .windows(2)
            .any(|w| segment_intersects_rect(w[0], w[1], rect)),
    }
}

/// Extent of the part of a polyline lying inside the vertical slab
/// `lo <= x <= hi`. Used to compute how far a label must move vertically to
/// clear the curve locally.
pub fn polyline_extent_in_x_slab(points: &[Point], lo: f64, hi: f64) -> Option<BBox> {
    let slab = BBox::new(lo, f64::MIN / 4.0, hi, f64::MAX / 4.0);
    clipped_extent(points, &slab)
}

/// Horizontal counterpart of [`polyline_extent_in_x_slab`].
pub fn polyline_extent_in_y_slab(points: &[Point], lo: f64, hi: f64) -> Option<BBox> {
    let slab = BBox::new(f64::MIN / 4.0, lo, f64::MAX / 4.0, hi);
    clipped_extent(points, &slab)
}

fn clipped_extent(points: &[Point], slab: &BBox) -> Option<BBox> {
    if let [only] = points {
        return slab.contains_point(*only).then(|| BBox::point(*only));
    }
    let mut out: Option<BBox> = None;
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        if let Some((t0, t1)) = clip_segment(a, b, slab) {
            let p0 = Point::new(a.x + (b.x - a.x) * t0, a.y + (b.y - a.y) * t0);
            let p1 = Point::new(a.x + (b.x - a.x) * t1, a.y + (b.y - a.y) * t1);
            let piece = BBox::new(p0.x, p0.y, p1.x, p1.y);
            out = Some(match out {
                Some(acc) => acc.union(&piece),
                None => piece,
            });
        }
    }
    out
}
