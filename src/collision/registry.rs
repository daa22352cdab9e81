//! Participation registry: a per-surface side table classifying visual
//! elements as Moveable, Fixed, Passive or line-path obstacles.
//!
//! The registry never extends the lifetime of a surface or an element. It
//! holds `Weak` references only; entries whose surface has been dropped are
//! invisible to readers and pruned on the next registration.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashMap;

use super::element::{Boundable, ElementKey, PathGeometry, Positionable, Shared};
use super::geometry::{BBox, Point};
use super::surface::{CoordTransform, Surface, SurfaceId, SurfaceInner};

/// How an element takes part in collision resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Eligible for repositioning.
    Moveable,
    /// Immovable obstacle.
    Fixed,
    /// Drawn but ignored by collision; suppresses auto-detection.
    Passive,
    /// Continuous curve whose actual path repels labels.
    LinePathObstacle,
}

pub(crate) struct MoveableEntry {
    pub(crate) key: ElementKey,
    pub(crate) element: Weak<RefCell<dyn Positionable>>,
    /// Anchor position (data coordinates) at first registration.
    pub(crate) anchor: Point,
}

pub(crate) struct BoundEntry {
    pub(crate) key: ElementKey,
    pub(crate) element: Weak<RefCell<dyn Boundable>>,
}

/// Pixel path of a line obstacle, valid for one transform.
#[derive(Debug, Clone)]
pub(crate) struct PathCache {
    pub(crate) transform: CoordTransform,
    /// Data-space vertices the pixels were computed from.
    pub(crate) source: Rc<[Point]>,
    pub(crate) pixels: Rc<[Point]>,
    pub(crate) extent: Option<BBox>,
}

pub(crate) struct LinePathEntry {
    pub(crate) key: ElementKey,
    pub(crate) element: Weak<RefCell<dyn PathGeometry>>,
    pub(crate) cache: RefCell<Option<PathCache>>,
}

impl LinePathEntry {
    /// Pixel path under `transform`, recomputed only when the transform or
    /// any vertex changed. `None` once the element is gone.
    pub(crate) fn pixel_path(&self, transform: &CoordTransform) -> Option<PathCache> {
        let element = self.element.upgrade()?;
        let element = element.borrow();
        let vertices = element.vertices();
        let mut cache = self.cache.borrow_mut();
        let fresh = cache
            .as_ref()
            .is_some_and(|c| c.transform == *transform && *c.source == *vertices);
        if !fresh {
            let pixels: Rc<[Point]> = vertices.iter().map(|p| transform.to_pixel(*p)).collect();
            let extent = BBox::from_points(pixels.iter());
            *cache = Some(PathCache {
                transform: *transform,
                source: Rc::from(vertices),
                pixels,
                extent,
            });
        }
        cache.clone()
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.element
            .upgrade()
            .is_some_and(|e| e.borrow().is_visible())
    }
}

pub(crate) struct SurfaceEntry {
    surface: Weak<SurfaceInner>,
    pub(crate) moveable: Vec<MoveableEntry>,
    pub(crate) fixed: Vec<BoundEntry>,
    pub(crate) passive: Vec<BoundEntry>,
    pub(crate) line_paths: Vec<LinePathEntry>,
}

impl SurfaceEntry {
    fn new(surface: &Surface) -> Self {
        Self {
            surface: surface.downgrade(),
            moveable: Vec::new(),
            fixed: Vec::new(),
            passive: Vec::new(),
            line_paths: Vec::new(),
        }
    }

    fn is_alive(&self) -> bool {
        self.surface.strong_count() > 0
    }

    fn prune_dead_elements(&mut self) {
        self.moveable.retain(|e| e.element.strong_count() > 0);
        self.fixed.retain(|e| e.element.strong_count() > 0);
        self.passive.retain(|e| e.element.strong_count() > 0);
        self.line_paths.retain(|e| e.element.strong_count() > 0);
    }

    pub(crate) fn keys(&self, category: Category) -> Vec<ElementKey> {
        match category {
            Category::Moveable => self
                .moveable
                .iter()
                .filter(|e| e.element.strong_count() > 0)
                .map(|e| e.key)
                .collect(),
            Category::Fixed => live_bound_keys(&self.fixed),
            Category::Passive => live_bound_keys(&self.passive),
            Category::LinePathObstacle => self
                .line_paths
                .iter()
                .filter(|e| e.element.strong_count() > 0)
                .map(|e| e.key)
                .collect(),
        }
    }
}

fn live_bound_keys(entries: &[BoundEntry]) -> Vec<ElementKey> {
    entries
        .iter()
        .filter(|e| e.element.strong_count() > 0)
        .map(|e| e.key)
        .collect()
}

/// Side table from surface identity to classified elements.
#[derive(Default)]
pub struct ParticipationRegistry {
    entries: AHashMap<SurfaceId, SurfaceEntry>,
}

impl ParticipationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a label that may be moved. Idempotent.
    pub fn register_moveable<T: Positionable + 'static>(&mut self, surface: &Surface, element: &Shared<T>) {
        let key = ElementKey::of(element);
        let entry = self.entry_mut(surface);
        if entry.moveable.iter().any(|e| e.key == key) {
            return;
        }
        let anchor = element.borrow().position();
        let as_dyn: Rc<RefCell<dyn Positionable>> = element.clone();
        entry.moveable.push(MoveableEntry {
            key,
            element: Rc::downgrade(&as_dyn),
            anchor,
        });
    }

    /// Register an immovable obstacle. Idempotent.
    pub fn register_fixed<T: Boundable + 'static>(&mut self, surface: &Surface, element: &Shared<T>) {
        let key = ElementKey::of(element);
        let entry = self.entry_mut(surface);
        if entry.fixed.iter().any(|e| e.key == key) {
            return;
        }
        let as_dyn: Rc<RefCell<dyn Boundable>> = element.clone();
        entry.fixed.push(BoundEntry {
            key,
            element: Rc::downgrade(&as_dyn),
        });
    }

    /// Register an element collision must ignore. Idempotent.
    pub fn register_passive<T: Boundable + 'static>(&mut self, surface: &Surface, element: &Shared<T>) {
        let key = ElementKey::of(element);
        let entry = self.entry_mut(surface);
        if entry.passive.iter().any(|e| e.key == key) {
            return;
        }
        let as_dyn: Rc<RefCell<dyn Boundable>> = element.clone();
        entry.passive.push(BoundEntry {
            key,
            element: Rc::downgrade(&as_dyn),
        });
    }

    /// Register a continuous curve obstacle. Use this rather than
    /// [`register_fixed`](Self::register_fixed) for lines: a curve's overall
    /// bounding box is a useless obstacle. Idempotent.
    pub fn register_line_path<T: PathGeometry + 'static>(&mut self, surface: &Surface, element: &Shared<T>) {
        let key = ElementKey::of(element);
        let entry = self.entry_mut(surface);
        if entry.line_paths.iter().any(|e| e.key == key) {
            return;
        }
        let as_dyn: Rc<RefCell<dyn PathGeometry>> = element.clone();
        entry.line_paths.push(LinePathEntry {
            key,
            element: Rc::downgrade(&as_dyn),
            cache: RefCell::new(None),
        });
    }

    /// Identities registered under `category` for `surface`, in registration order.
    pub fn elements_of(&self, surface: &Surface, category: Category) -> Vec<ElementKey> {
        self.entry(surface.id())
            .map(|e| e.keys(category))
            .unwrap_or_default()
    }

    /// Number of surfaces with live registry entries.
    pub fn surface_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_alive()).count()
    }

    /// Drop entries for destroyed surfaces and elements. Registration does
    /// this implicitly.
    pub fn collect_garbage(&mut self) {
        self.entries.retain(|_, e| e.is_alive());
        for entry in self.entries.values_mut() {
            entry.prune_dead_elements();
        }
    }

    /// Live surfaces that have entries, ordered by id.
    pub fn surfaces(&self) -> Vec<Surface> {
        let mut out: Vec<Surface> = self
            .entries
            .values()
            .filter_map(|e| Surface::from_weak(&e.surface))
            .collect();
        out.sort_by_key(Surface::id);
        out
    }

    pub(crate) fn entry(&self, id: SurfaceId) -> Option<&SurfaceEntry> {
        self.entries.get(&id).filter(|e| e.is_alive())
    }

    fn entry_mut(&mut self, surface: &Surface) -> &mut SurfaceEntry {
        self.collect_garbage();
        self.entries
            .entry(surface.id())
            .or_insert_with(|| SurfaceEntry::new(surface))
    }
}
