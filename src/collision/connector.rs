//! Guide lines from a displaced label back to its original anchor.
//!
//! Connectors are planned in data coordinates and grouped by owning surface,
//! so each group is drawn through its own surface's transform. They are
//! never fed back into collision resolution.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use plotters::coord::Shift;
use plotters::prelude::*;

use super::geometry::Point;
use super::registry::ParticipationRegistry;
use super::surface::{Surface, SurfaceId};
use crate::config::ConnectorStyle;

/// One guide line, endpoints in the owning surface's data coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connector {
    pub anchor: Point,
    pub resolved: Point,
    /// Pixel distance between the endpoints at planning time.
    pub distance: f64,
}

/// Connectors sharing one surface (and therefore one transform).
#[derive(Debug, Clone)]
pub struct ConnectorGroup {
    pub surface: Surface,
    pub connectors: Vec<Connector>,
}

/// Plan connectors for every Moveable on `surfaces` whose final position is
/// strictly more than `threshold` pixels from its registered anchor.
pub fn plan_connectors(
    registry: &ParticipationRegistry,
    surfaces: &[Surface],
    threshold: f64,
) -> BTreeMap<SurfaceId, ConnectorGroup> {
    let mut groups: BTreeMap<SurfaceId, ConnectorGroup> = BTreeMap::new();
    for surface in surfaces {
        let Some(entry) = registry.entry(surface.id()) else {
            continue;
        };
        let ctx = surface.transform();
        for m in &entry.moveable {
            let Some(element) = m.element.upgrade() else {
                continue;
            };
            let resolved = element.borrow().position();
            let distance = ctx.to_pixel(m.anchor).distance(ctx.to_pixel(resolved));
            if distance <= threshold {
                continue;
            }
            groups
                .entry(surface.id())
                .or_insert_with(|| ConnectorGroup {
                    surface: surface.clone(),
                    connectors: Vec::new(),
                })
                .connectors
                .push(Connector {
                    anchor: m.anchor,
                    resolved,
                    distance,
                });
        }
    }
    groups
}

fn to_backend(p: Point) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

/// Split `a`-`b` into dash pieces of `on` pixels separated by `off` pixels.
pub(crate) fn dash_segments(a: Point, b: Point, on: f64, off: f64) -> Vec<(Point, Point)> {
    let len = a.distance(b);
    if len <= f64::EPSILON || on <= 0.0 {
        return vec![(a, b)];
    }
    let (ux, uy) = ((b.x - a.x) / len, (b.y - a.y) / len);
    let at = |t: f64| Point::new(a.x + ux * t, a.y + uy * t);
    let mut out = Vec::new();
    let mut t = 0.0;
    while t < len {
        let end = (t + on).min(len);
        out.push((at(t), at(end)));
        t = end + off.max(0.0);
    }
    out
}

/// Draw every group with its own surface transform onto `area` (whose pixel
/// origin must match the surfaces' pixel space).
pub fn draw_connectors<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    groups: &BTreeMap<SurfaceId, ConnectorGroup>,
    style: &ConnectorStyle,
) -> Result<usize> {
    let [r, g, b] = style.color;
    let line_style = RGBColor(r, g, b)
        .mix(style.opacity)
        .stroke_width(style.width);
    let mut drawn = 0usize;
    for group in groups.values() {
        let ctx = group.surface.transform();
        for c in &group.connectors {
            let a = ctx.to_pixel(c.anchor);
            let b = ctx.to_pixel(c.resolved);
            let pieces = match style.dash {
                Some([on, off]) => dash_segments(a, b, on as f64, off as f64),
                None => vec![(a, b)],
            };
            for (p0, p1) in pieces {
                area.draw(&PathElement::new(
                    vec![to_backend(p0), to_backend(p1)],
                    line_style,
                ))
                .map_err(|e| anyhow!("{:?}", e))?;
            }
            drawn += 1;
        }
    }
    Ok(drawn)
}
