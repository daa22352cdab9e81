//! Capability traits a visual element implements to take part in collision
//! resolution, plus identity handling for shared element handles.

use std::cell::RefCell;
use std::rc::Rc;

use super::geometry::{BBox, Point};
use super::surface::CoordTransform;

/// Shared, mutable handle to a visual element. Renderers own these; the
/// registry only keeps weak references.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap an element into a [`Shared`] handle.
pub fn shared<T>(element: T) -> Shared<T> {
    Rc::new(RefCell::new(element))
}

/// Anything that can report where it sits on screen. Required for obstacles.
pub trait Boundable {
    /// Bounding rectangle in pixels under the given transform.
    fn bbox(&self, ctx: &CoordTransform) -> BBox;

    fn is_visible(&self) -> bool {
        true
    }
}

/// A Boundable that can be moved. Required for Moveable labels.
///
/// Positions are anchor points in data coordinates; the resolver converts
/// pixel displacements back through the owning surface's transform.
pub trait Positionable: Boundable {
    fn position(&self) -> Point;
    fn set_position(&mut self, position: Point);
}

/// A continuous curve repelling labels along its visible path.
pub trait PathGeometry {
    /// Ordered vertices in data coordinates.
    fn vertices(&self) -> &[Point];

    fn is_visible(&self) -> bool {
        true
    }
}

/// Identity of an element handle, derived from its allocation address.
///
/// Only meaningful while the element is alive; the registry drops entries
/// whose weak reference no longer upgrades before comparing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementKey(usize);

impl ElementKey {
    pub fn of<T: ?Sized>(element: &Rc<RefCell<T>>) -> Self {
        ElementKey(Rc::as_ptr(element) as *const () as usize)
    }
}
