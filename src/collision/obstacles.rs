//! Obstacle collection for one resolution pass.
//!
//! Gathers, for a set of surfaces and their x-sharing siblings:
//! explicit Fixed elements, auto-detected patches that are not otherwise
//! classified, and one continuous obstacle per registered line path.

use std::collections::BTreeMap;
use std::rc::Rc;

use ahash::AHashSet;

use super::element::ElementKey;
use super::geometry::{
    BBox, Point, polyline_extent_in_x_slab, polyline_extent_in_y_slab, polyline_intersects_rect,
};
use super::registry::{Category, ParticipationRegistry};
use super::surface::{Surface, SurfaceId};

/// Where an obstacle came from; the debug overlay colors by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleSource {
    Fixed,
    Patch,
    LinePath,
    /// Moveable of an x-sharing sibling that is not part of the pool.
    Label,
}

#[derive(Debug, Clone)]
pub enum Shape {
    Rect(BBox),
    /// Pixel-space polyline with its precomputed overall extent.
    Path { pixels: Rc<[Point]>, extent: BBox },
}

/// One obstacle in pixel space.
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub key: ElementKey,
    pub source: ObstacleSource,
    pub surface: SurfaceId,
    pub shape: Shape,
}

impl Obstacle {
    /// Overall bounding rectangle.
    pub fn extent(&self) -> BBox {
        match &self.shape {
            Shape::Rect(b) => *b,
            Shape::Path { extent, .. } => *extent,
        }
    }

    /// Does the (already padded) label rectangle hit this obstacle?
    ///
    /// Paths are quick-rejected on their extent before the exact test.
    pub fn collides(&self, padded: &BBox) -> bool {
        match &self.shape {
            Shape::Rect(b) => b.overlaps(padded),
            Shape::Path { pixels, extent } => {
                extent.overlaps(padded) && polyline_intersects_rect(pixels, padded)
            }
        }
    }

    /// Region a label must clear when moving vertically. For paths this is
    /// the part of the curve inside the padded label's column.
    pub fn vertical_clearance(&self, padded: &BBox) -> Option<BBox> {
        match &self.shape {
            Shape::Rect(b) => Some(*b),
            Shape::Path { pixels, .. } => {
                polyline_extent_in_x_slab(pixels, padded.x_min, padded.x_max)
            }
        }
    }

    /// Horizontal counterpart of [`vertical_clearance`](Self::vertical_clearance).
    pub fn horizontal_clearance(&self, padded: &BBox) -> Option<BBox> {
        match &self.shape {
            Shape::Rect(b) => Some(*b),
            Shape::Path { pixels, .. } => {
                polyline_extent_in_y_slab(pixels, padded.y_min, padded.y_max)
            }
        }
    }
}

/// Obstacles for one resolution pass; immutable once collected.
#[derive(Debug, Clone, Default)]
pub struct ObstacleSet {
    obstacles: Vec<Obstacle>,
}

impl ObstacleSet {
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn any_collision(&self, padded: &BBox) -> bool {
        self.obstacles.iter().any(|o| o.collides(padded))
    }

    pub fn colliding<'a>(&'a self, padded: &'a BBox) -> impl Iterator<Item = &'a Obstacle> + 'a {
        self.obstacles.iter().filter(move |o| o.collides(padded))
    }

    pub fn contains_key(&self, key: ElementKey) -> bool {
        self.obstacles.iter().any(|o| o.key == key)
    }

    /// Add obstacles not already present.
    pub fn extend(&mut self, extra: impl IntoIterator<Item = Obstacle>) {
        for obstacle in extra {
            if !self.contains_key(obstacle.key) {
                self.obstacles.push(obstacle);
            }
        }
    }

    /// Drop obstacles whose identity is in `keys`.
    pub fn exclude(&mut self, keys: &AHashSet<ElementKey>) {
        self.obstacles.retain(|o| !keys.contains(&o.key));
    }
}

/// The given surfaces plus every live sibling, deduplicated, ordered by id.
pub fn surface_group(surfaces: &[Surface]) -> Vec<Surface> {
    let mut group: BTreeMap<SurfaceId, Surface> = BTreeMap::new();
    for s in surfaces {
        group.entry(s.id()).or_insert_with(|| s.clone());
        for sib in s.siblings() {
            group.entry(sib.id()).or_insert(sib);
        }
    }
    group.into_values().collect()
}

/// Build the obstacle set for a pass over `surfaces`.
///
/// Never fails; surfaces without registrations contribute only their
/// unclassified patches.
pub fn collect_obstacles(registry: &ParticipationRegistry, surfaces: &[Surface]) -> ObstacleSet {
    let group = surface_group(surfaces);

    // Anything classified anywhere in the group is excluded from auto-detection.
    let mut classified: AHashSet<ElementKey> = AHashSet::new();
    for s in &group {
        for category in [Category::Moveable, Category::Passive, Category::Fixed] {
            classified.extend(registry.elements_of(s, category));
        }
    }

    let mut seen: AHashSet<ElementKey> = AHashSet::new();
    let mut obstacles = Vec::new();

    for s in &group {
        let ctx = s.transform();
        let Some(entry) = registry.entry(s.id()) else {
            continue;
        };
        for fixed in &entry.fixed {
            let Some(element) = fixed.element.upgrade() else {
                continue;
            };
            let element = element.borrow();
            if !element.is_visible() || !seen.insert(fixed.key) {
                continue;
            }
            obstacles.push(Obstacle {
                key: fixed.key,
                source: ObstacleSource::Fixed,
                surface: s.id(),
                shape: Shape::Rect(element.bbox(&ctx)),
            });
        }
    }

    for s in &group {
        let ctx = s.transform();
        for (key, patch) in s.patches() {
            if classified.contains(&key) {
                continue;
            }
            let patch = patch.borrow();
            if !patch.is_visible() || !seen.insert(key) {
                continue;
            }
            obstacles.push(Obstacle {
                key,
                source: ObstacleSource::Patch,
                surface: s.id(),
                shape: Shape::Rect(patch.bbox(&ctx)),
            });
        }
    }

    for s in &group {
        let ctx = s.transform();
        let Some(entry) = registry.entry(s.id()) else {
            continue;
        };
        for line in &entry.line_paths {
            if !line.is_visible() || seen.contains(&line.key) {
                continue;
            }
            let Some(cache) = line.pixel_path(&ctx) else {
                continue;
            };
            let Some(extent) = cache.extent else {
                continue;
            };
            seen.insert(line.key);
            obstacles.push(Obstacle {
                key: line.key,
                source: ObstacleSource::LinePath,
                surface: s.id(),
                shape: Shape::Path {
                    pixels: cache.pixels,
                    extent,
                },
            });
        }
    }

    log::trace!(
        "collected {} obstacles over {} surface(s)",
        obstacles.len(),
        group.len()
    );
    ObstacleSet { obstacles }
}

/// Visible Moveables of sibling surfaces outside `surfaces`, pinned where
/// they currently are.
///
/// Resolving one surface alone must not push its labels onto the labels of
/// a twin it shares the x dimension with.
pub fn pinned_labels(registry: &ParticipationRegistry, surfaces: &[Surface]) -> Vec<Obstacle> {
    let pool: AHashSet<SurfaceId> = surfaces.iter().map(Surface::id).collect();
    let mut pinned = Vec::new();
    for s in surface_group(surfaces) {
        if pool.contains(&s.id()) {
            continue;
        }
        let Some(entry) = registry.entry(s.id()) else {
            continue;
        };
        let ctx = s.transform();
        for m in &entry.moveable {
            let Some(element) = m.element.upgrade() else {
                continue;
            };
            let element = element.borrow();
            if !element.is_visible() {
                continue;
            }
            pinned.push(Obstacle {
                key: m.key,
                source: ObstacleSource::Label,
                surface: s.id(),
                shape: Shape::Rect(element.bbox(&ctx)),
            });
        }
    }
    pinned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::element::{Boundable, PathGeometry, shared};
    use crate::collision::surface::CoordTransform;

    struct Block {
        bbox: BBox,
        visible: bool,
    }

    impl Boundable for Block {
        fn bbox(&self, _ctx: &CoordTransform) -> BBox {
            self.bbox
        }
        fn is_visible(&self) -> bool {
            self.visible
        }
    }

    struct Line(Vec<Point>);

    impl PathGeometry for Line {
        fn vertices(&self) -> &[Point] {
            &self.0
        }
    }

    fn block(x0: f64, y0: f64, x1: f64, y1: f64) -> Block {
        Block {
            bbox: BBox::new(x0, y0, x1, y1),
            visible: true,
        }
    }

    #[test]
    fn patches_are_auto_detected_unless_classified_or_hidden() {
        let s = Surface::new("s", BBox::new(0.0, 0.0, 500.0, 500.0), CoordTransform::identity());
        let bar = shared(block(0.0, 0.0, 10.0, 10.0));
        let band = shared(block(20.0, 0.0, 30.0, 10.0));
        let hidden = shared(Block {
            visible: false,
            ..block(40.0, 0.0, 50.0, 10.0)
        });
        let fixed = shared(block(60.0, 0.0, 70.0, 10.0));
        for p in [&bar, &band, &hidden, &fixed] {
            s.add_patch(p);
        }
        let mut reg = ParticipationRegistry::new();
        reg.register_passive(&s, &band);
        reg.register_fixed(&s, &fixed);

        let set = collect_obstacles(&reg, std::slice::from_ref(&s));
        assert_eq!(set.len(), 2);
        assert!(set.contains_key(ElementKey::of(&bar)));
        assert!(set.contains_key(ElementKey::of(&fixed)));
        assert!(!set.contains_key(ElementKey::of(&band)));
        let fixed_count = set
            .iter()
            .filter(|o| o.source == ObstacleSource::Fixed)
            .count();
        assert_eq!(fixed_count, 1);
    }

    #[test]
    fn sibling_fixed_elements_are_included() {
        let main = Surface::new("a", BBox::new(0.0, 0.0, 500.0, 500.0), CoordTransform::identity());
        let twin = main.twin("b", CoordTransform::identity());
        let legend = shared(block(0.0, 0.0, 10.0, 10.0));
        let mut reg = ParticipationRegistry::new();
        reg.register_fixed(&twin, &legend);
        let set = collect_obstacles(&reg, std::slice::from_ref(&main));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn line_path_collides_only_along_the_curve() {
        let s = Surface::new("s", BBox::new(0.0, 0.0, 500.0, 500.0), CoordTransform::identity());
        let line = shared(Line(vec![Point::new(0.0, 0.0), Point::new(100.0, 100.0)]));
        let mut reg = ParticipationRegistry::new();
        reg.register_line_path(&s, &line);
        let set = collect_obstacles(&reg, std::slice::from_ref(&s));
        assert_eq!(set.len(), 1);
        assert!(!set.any_collision(&BBox::new(70.0, 0.0, 90.0, 20.0)));
        assert!(set.any_collision(&BBox::new(45.0, 40.0, 65.0, 60.0)));
        assert!(!set.any_collision(&BBox::new(200.0, 200.0, 220.0, 220.0)));
    }

    #[test]
    fn edited_vertices_refresh_the_cached_path() {
        let s = Surface::new("s", BBox::new(0.0, 0.0, 500.0, 500.0), CoordTransform::identity());
        let line = shared(Line(vec![Point::new(0.0, 10.0), Point::new(100.0, 10.0)]));
        let mut reg = ParticipationRegistry::new();
        reg.register_line_path(&s, &line);
        let before = collect_obstacles(&reg, std::slice::from_ref(&s));
        assert_eq!(before.iter().next().unwrap().extent().y_max, 10.0);

        line.borrow_mut().0[1].y = 300.0;
        let after = collect_obstacles(&reg, std::slice::from_ref(&s));
        let extent = after.iter().next().unwrap().extent();
        assert_eq!((extent.y_min, extent.y_max), (10.0, 300.0));
        assert!(after.any_collision(&BBox::new(45.0, 150.0, 55.0, 160.0)));
    }

    #[test]
    fn empty_registry_yields_empty_set() {
        let s = Surface::new("s", BBox::new(0.0, 0.0, 10.0, 10.0), CoordTransform::identity());
        let reg = ParticipationRegistry::new();
        assert!(collect_obstacles(&reg, &[s]).is_empty());
    }
}
