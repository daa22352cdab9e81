//! Displacement resolver: the iterative greedy pass that moves Moveable
//! labels off obstacles and off each other.
//!
//! Each outer pass visits the labels in registration order. A colliding
//! label gets up/down/left/right candidates that just clear each obstacle it
//! touches (plus split moves when the obstacle is another label). Candidates
//! are tried smallest first and each is re-validated against the full
//! obstacle set, every other label and the surface bounds before it is
//! applied. Passes repeat until nothing moves or `max_iterations` is hit.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use ahash::AHashSet;
use serde::Serialize;

use super::element::{ElementKey, Positionable};
use super::geometry::{BBox, EPS};
use super::obstacles::{Obstacle, ObstacleSet, collect_obstacles, pinned_labels};
use super::registry::ParticipationRegistry;
use super::surface::{CoordTransform, Surface, SurfaceId};
use crate::config::{CollisionConfig, Movement};

/// Displacement direction in screen space (y grows downward, so `Up` is -y).
///
/// The declaration order is the tie-break between equal-magnitude candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    fn allowed(self, movement: Movement) -> bool {
        if self.is_vertical() {
            movement.allows_y()
        } else {
            movement.allows_x()
        }
    }
}

/// Outcome of one resolution call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ResolveReport {
    /// Moveable labels taking part.
    pub labels: usize,
    /// Obstacles in the collected set.
    pub obstacles: usize,
    /// Outer passes performed (never more than `max_iterations`).
    pub passes: usize,
    /// Individual label moves applied.
    pub moves: usize,
    /// True when the last pass moved nothing.
    pub converged: bool,
    /// Labels still colliding after the final pass.
    pub unresolved: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum AxisRank {
    Y,
    X,
    Diagonal,
}

/// One proposed move, ephemeral within a single label's attempt.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    direction: Direction,
    rank: AxisRank,
    /// Largest displacement any label undergoes in this candidate.
    magnitude: f64,
    dx: f64,
    dy: f64,
    /// Other label moved in the opposite direction (split move).
    partner: Option<(usize, f64, f64)>,
}

impl Candidate {
    fn solo(direction: Direction, delta: f64) -> Self {
        let (dx, dy) = if direction.is_vertical() {
            (0.0, delta)
        } else {
            (delta, 0.0)
        };
        Self {
            direction,
            rank: if direction.is_vertical() {
                AxisRank::Y
            } else {
                AxisRank::X
            },
            magnitude: delta.abs(),
            dx,
            dy,
            partner: None,
        }
    }

    fn split(direction: Direction, delta: f64, partner: usize) -> Self {
        let half = delta * 0.5;
        let mut c = Self::solo(direction, half);
        c.partner = Some((partner, -c.dx, -c.dy));
        c
    }

    fn order(&self, other: &Self) -> Ordering {
        self.magnitude
            .total_cmp(&other.magnitude)
            .then(self.rank.cmp(&other.rank))
            .then(self.direction.cmp(&other.direction))
            .then(self.partner.is_none().cmp(&other.partner.is_none()))
    }
}

/// Signed shift along `direction` that puts `bbox` `pad` pixels clear of
/// `clear`. `None` when the shift would not go in that direction.
fn clearing_shift(direction: Direction, bbox: &BBox, clear: &BBox, pad: f64) -> Option<f64> {
    let delta = match direction {
        Direction::Up => (clear.y_min - pad) - bbox.y_max,
        Direction::Down => (clear.y_max + pad) - bbox.y_min,
        Direction::Left => (clear.x_min - pad) - bbox.x_max,
        Direction::Right => (clear.x_max + pad) - bbox.x_min,
    };
    let ok = match direction {
        Direction::Up | Direction::Left => delta < -EPS,
        Direction::Down | Direction::Right => delta > EPS,
    };
    ok.then_some(delta)
}

const DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

/// How many single-axis candidates per axis the diagonal fallback combines.
const DIAGONAL_FANOUT: usize = 4;

struct Label {
    key: ElementKey,
    element: Rc<RefCell<dyn Positionable>>,
    surface: SurfaceId,
    ctx: CoordTransform,
    bounds: BBox,
    bbox: BBox,
}

struct Resolver<'a> {
    config: &'a CollisionConfig,
    obstacles: ObstacleSet,
    labels: Vec<Label>,
}

/// Resolve collisions for every Moveable registered on `surfaces`, which
/// form one pool. Positions are updated in place through
/// [`Positionable::set_position`]; the engine never fails.
pub fn resolve(
    registry: &ParticipationRegistry,
    surfaces: &[Surface],
    config: &CollisionConfig,
) -> ResolveReport {
    let labels = gather_labels(registry, surfaces);
    let keys: AHashSet<ElementKey> = labels.iter().map(|l| l.key).collect();
    let mut obstacles = collect_obstacles(registry, surfaces);
    obstacles.extend(pinned_labels(registry, surfaces));
    obstacles.exclude(&keys);

    let mut resolver = Resolver {
        config,
        obstacles,
        labels,
    };
    let report = resolver.run();
    log::debug!(
        "label resolution: {} labels, {} obstacles, {} passes, {} moves, converged={}, unresolved={}",
        report.labels,
        report.obstacles,
        report.passes,
        report.moves,
        report.converged,
        report.unresolved
    );
    if !report.converged {
        log::warn!(
            "label resolution stopped after {} passes without converging",
            report.passes
        );
    }
    report
}

fn gather_labels(registry: &ParticipationRegistry, surfaces: &[Surface]) -> Vec<Label> {
    let mut labels = Vec::new();
    let mut seen: AHashSet<ElementKey> = AHashSet::new();
    for surface in surfaces {
        let Some(entry) = registry.entry(surface.id()) else {
            continue;
        };
        let ctx = surface.transform();
        for m in &entry.moveable {
            let Some(element) = m.element.upgrade() else {
                continue;
            };
            let bbox = {
                let e = element.borrow();
                if !e.is_visible() {
                    continue;
                }
                e.bbox(&ctx)
            };
            if !seen.insert(m.key) {
                continue;
            }
            labels.push(Label {
                key: m.key,
                element,
                surface: surface.id(),
                ctx,
                bounds: surface.area(),
                bbox,
            });
        }
    }
    labels
}

impl Resolver<'_> {
    fn run(&mut self) -> ResolveReport {
        let mut report = ResolveReport {
            labels: self.labels.len(),
            obstacles: self.obstacles.len(),
            ..ResolveReport::default()
        };
        if self.labels.is_empty() {
            report.converged = true;
            return report;
        }
        for _ in 0..self.config.max_iterations {
            report.passes += 1;
            let mut moved = false;
            for idx in 0..self.labels.len() {
                if self.resolve_label(idx) {
                    moved = true;
                    report.moves += 1;
                }
            }
            if !moved {
                report.converged = true;
                break;
            }
        }
        report.unresolved = (0..self.labels.len())
            .filter(|&i| self.collides(i))
            .count();
        report
    }

    fn collides(&self, idx: usize) -> bool {
        let bbox = self.labels[idx].bbox;
        self.obstacles
            .any_collision(&bbox.pad(self.config.obstacle_padding))
            || self.colliding_labels(idx).next().is_some()
    }

    fn colliding_labels(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let padded = self.labels[idx].bbox.pad(self.config.label_padding);
        self.labels
            .iter()
            .enumerate()
            .filter(move |(k, other)| *k != idx && padded.overlaps(&other.bbox))
            .map(|(k, _)| k)
    }

    /// Try to move one label; true when it moved.
    fn resolve_label(&mut self, idx: usize) -> bool {
        let bbox = self.labels[idx].bbox;
        let obstacle_pad = self.config.obstacle_padding;
        let label_pad = self.config.label_padding;
        let movement = self.config.movement;

        let padded = bbox.pad(obstacle_pad);
        let hit_obstacles: Vec<&Obstacle> = self.obstacles.colliding(&padded).collect();
        let hit_labels: Vec<usize> = self.colliding_labels(idx).collect();
        if hit_obstacles.is_empty() && hit_labels.is_empty() {
            return false;
        }

        let mut candidates: Vec<Candidate> = Vec::new();
        for obstacle in &hit_obstacles {
            for direction in DIRECTIONS {
                if !direction.allowed(movement) {
                    continue;
                }
                let clear = if direction.is_vertical() {
                    obstacle.vertical_clearance(&padded)
                } else {
                    obstacle.horizontal_clearance(&padded)
                };
                if let Some(delta) =
                    clear.and_then(|c| clearing_shift(direction, &bbox, &c, obstacle_pad))
                {
                    candidates.push(Candidate::solo(direction, delta));
                }
            }
        }
        for &other in &hit_labels {
            let other_bbox = self.labels[other].bbox;
            for direction in DIRECTIONS {
                if !direction.allowed(movement) {
                    continue;
                }
                if let Some(delta) = clearing_shift(direction, &bbox, &other_bbox, label_pad) {
                    candidates.push(Candidate::split(direction, delta, other));
                    candidates.push(Candidate::solo(direction, delta));
                }
            }
        }
        candidates.sort_by(Candidate::order);

        if let Some(chosen) = candidates.iter().find(|c| self.is_valid(idx, c)).copied() {
            self.apply(idx, &chosen);
            return true;
        }

        if movement == Movement::XY {
            if let Some(diagonal) = self.diagonal_fallback(idx, &candidates) {
                self.apply(idx, &diagonal);
                return true;
            }
        }

        log::trace!(
            "label {:?} on {} is trapped: {} candidate(s), none valid",
            self.labels[idx].key,
            self.labels[idx].surface,
            candidates.len()
        );
        false
    }

    /// Combine the best vertical and best horizontal solo candidates.
    fn diagonal_fallback(&self, idx: usize, candidates: &[Candidate]) -> Option<Candidate> {
        let solo = candidates.iter().filter(|c| c.partner.is_none());
        let ys: Vec<&Candidate> = solo
            .clone()
            .filter(|c| c.rank == AxisRank::Y)
            .take(DIAGONAL_FANOUT)
            .collect();
        let xs: Vec<&Candidate> = solo
            .filter(|c| c.rank == AxisRank::X)
            .take(DIAGONAL_FANOUT)
            .collect();
        let mut combos: Vec<Candidate> = ys
            .iter()
            .flat_map(|y| {
                xs.iter().map(move |x| Candidate {
                    direction: y.direction,
                    rank: AxisRank::Diagonal,
                    magnitude: x.dx.hypot(y.dy),
                    dx: x.dx,
                    dy: y.dy,
                    partner: None,
                })
            })
            .collect();
        combos.sort_by(Candidate::order);
        combos.into_iter().find(|c| self.is_valid(idx, c))
    }

    /// Re-test a candidate against the full obstacle set, every other label
    /// and the surface bounds.
    fn is_valid(&self, idx: usize, candidate: &Candidate) -> bool {
        let mut moves: Vec<(usize, BBox)> =
            vec![(idx, self.labels[idx].bbox.translate(candidate.dx, candidate.dy))];
        if let Some((other, dx, dy)) = candidate.partner {
            moves.push((other, self.labels[other].bbox.translate(dx, dy)));
        }
        moves
            .iter()
            .all(|&(moved, bbox)| self.placement_ok(moved, &bbox, &moves))
    }

    fn placement_ok(&self, idx: usize, bbox: &BBox, moves: &[(usize, BBox)]) -> bool {
        if !self.labels[idx].bounds.contains(bbox) {
            return false;
        }
        if self
            .obstacles
            .any_collision(&bbox.pad(self.config.obstacle_padding))
        {
            return false;
        }
        let padded = bbox.pad(self.config.label_padding);
        self.labels.iter().enumerate().all(|(k, other)| {
            if k == idx {
                return true;
            }
            let other_bbox = moves
                .iter()
                .find(|(m, _)| *m == k)
                .map(|(_, b)| *b)
                .unwrap_or(other.bbox);
            !padded.overlaps(&other_bbox)
        })
    }

    fn apply(&mut self, idx: usize, candidate: &Candidate) {
        log::trace!(
            "moving label {:?} {:?} by ({:.2}, {:.2}){}",
            self.labels[idx].key,
            candidate.direction,
            candidate.dx,
            candidate.dy,
            if candidate.partner.is_some() {
                " (split)"
            } else {
                ""
            }
        );
        shift_label(&mut self.labels[idx], candidate.dx, candidate.dy);
        if let Some((other, dx, dy)) = candidate.partner {
            shift_label(&mut self.labels[other], dx, dy);
        }
    }
}

fn shift_label(label: &mut Label, dx: f64, dy: f64) {
    {
        let mut element = label.element.borrow_mut();
        let anchor_px = label.ctx.to_pixel(element.position());
        let moved = label.ctx.to_data(anchor_px.offset(dx, dy));
        element.set_position(moved);
    }
    label.bbox = label.bbox.translate(dx, dy);
}
