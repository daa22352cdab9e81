//! Coordinate surfaces: one plotting area with its own data → pixel
//! transform. Surfaces created with [`Surface::twin`] share the x dimension
//! (dual-axis charts) and see each other as siblings.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Range;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::element::{Boundable, ElementKey, Shared};
use super::geometry::{BBox, Point};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a surface, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Affine data → pixel mapping: `px = x * sx + ox`, `py = y * sy + oy`.
///
/// This is the rendering context handed to [`Boundable::bbox`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordTransform {
    pub sx: f64,
    pub ox: f64,
    pub sy: f64,
    pub oy: f64,
}

impl Default for CoordTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl CoordTransform {
    /// Data coordinates are already pixels.
    pub const fn identity() -> Self {
        Self {
            sx: 1.0,
            ox: 0.0,
            sy: 1.0,
            oy: 0.0,
        }
    }

    /// Map `x` onto `[area.x_min, area.x_max]` and `y` onto
    /// `[area.y_max, area.y_min]` (larger values higher on screen).
    /// Degenerate ranges are widened by one unit on each side.
    pub fn from_ranges(x: Range<f64>, y: Range<f64>, area: BBox) -> Self {
        let (x0, x1) = widen(x.start, x.end);
        let (y0, y1) = widen(y.start, y.end);
        let sx = area.width() / (x1 - x0);
        let sy = -area.height() / (y1 - y0);
        Self {
            sx,
            ox: area.x_min - x0 * sx,
            sy,
            oy: area.y_max - y0 * sy,
        }
    }

    pub fn to_pixel(&self, p: Point) -> Point {
        Point::new(p.x * self.sx + self.ox, p.y * self.sy + self.oy)
    }

    /// Inverse mapping; a zero scale leaves that coordinate untouched.
    pub fn to_data(&self, p: Point) -> Point {
        let x = if self.sx == 0.0 {
            p.x
        } else {
            (p.x - self.ox) / self.sx
        };
        let y = if self.sy == 0.0 {
            p.y
        } else {
            (p.y - self.oy) / self.sy
        };
        Point::new(x, y)
    }
}

fn widen(a: f64, b: f64) -> (f64, f64) {
    if (b - a).abs() < f64::EPSILON {
        (a - 1.0, b + 1.0)
    } else {
        (a, b)
    }
}

pub(crate) struct SurfaceInner {
    id: SurfaceId,
    name: String,
    area: Cell<BBox>,
    transform: Cell<CoordTransform>,
    patches: RefCell<Vec<(ElementKey, Rc<RefCell<dyn Boundable>>)>>,
    shared_x: Rc<RefCell<Vec<Weak<SurfaceInner>>>>,
}

/// Cheap, clonable handle to a coordinate surface. The surface is destroyed
/// when the last handle is dropped; registry entries for it then vanish.
#[derive(Clone)]
pub struct Surface {
    inner: Rc<SurfaceInner>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("area", &self.inner.area.get())
            .finish()
    }
}

impl Surface {
    /// `area` is the visible plotting rectangle in pixels.
    pub fn new(name: impl Into<String>, area: BBox, transform: CoordTransform) -> Self {
        let shared_x = Rc::new(RefCell::new(Vec::new()));
        let inner = Rc::new(SurfaceInner {
            id: SurfaceId(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            area: Cell::new(area),
            transform: Cell::new(transform),
            patches: RefCell::new(Vec::new()),
            shared_x: Rc::clone(&shared_x),
        });
        shared_x.borrow_mut().push(Rc::downgrade(&inner));
        Self { inner }
    }

    /// New surface over the same pixel area sharing this surface's x dimension
    /// (a secondary y axis).
    pub fn twin(&self, name: impl Into<String>, transform: CoordTransform) -> Self {
        let inner = Rc::new(SurfaceInner {
            id: SurfaceId(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            area: Cell::new(self.inner.area.get()),
            transform: Cell::new(transform),
            patches: RefCell::new(Vec::new()),
            shared_x: Rc::clone(&self.inner.shared_x),
        });
        self.inner
            .shared_x
            .borrow_mut()
            .push(Rc::downgrade(&inner));
        Self { inner }
    }

    pub fn id(&self) -> SurfaceId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn area(&self) -> BBox {
        self.inner.area.get()
    }

    pub fn set_area(&self, area: BBox) {
        self.inner.area.set(area);
    }

    pub fn transform(&self) -> CoordTransform {
        self.inner.transform.get()
    }

    /// Changing the transform invalidates cached line-path geometry.
    pub fn set_transform(&self, transform: CoordTransform) {
        self.inner.transform.set(transform);
    }

    /// Live surfaces sharing the x dimension, excluding `self`, in creation order.
    pub fn siblings(&self) -> Vec<Surface> {
        self.inner
            .shared_x
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|s| s.id != self.inner.id)
            .map(|inner| Surface { inner })
            .collect()
    }

    /// Record a filled shape drawn on this surface. Patches are candidates for
    /// automatic obstacle detection unless registered otherwise.
    pub fn add_patch<T: Boundable + 'static>(&self, patch: &Shared<T>) {
        let key = ElementKey::of(patch);
        let mut patches = self.inner.patches.borrow_mut();
        if patches.iter().any(|(k, _)| *k == key) {
            return;
        }
        let shared: Rc<RefCell<dyn Boundable>> = patch.clone();
        patches.push((key, shared));
    }

    pub fn patches(&self) -> Vec<(ElementKey, Rc<RefCell<dyn Boundable>>)> {
        self.inner.patches.borrow().clone()
    }

    pub(crate) fn downgrade(&self) -> Weak<SurfaceInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn from_weak(weak: &Weak<SurfaceInner>) -> Option<Surface> {
        weak.upgrade().map(|inner| Surface { inner })
    }
}

impl PartialEq for Surface {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Surface {}
