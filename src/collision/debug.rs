//! Diagnostic overlay: translucent outlines of everything the resolver sees.
//! Drawing only; it reads the registry and never moves anything.

use anyhow::{Result, anyhow};
use plotters::coord::Shift;
use plotters::prelude::*;

use super::geometry::{BBox, Point};
use super::obstacles::{ObstacleSource, Shape, collect_obstacles, surface_group};
use super::registry::ParticipationRegistry;
use super::surface::Surface;

const FIXED_COLOR: RGBColor = RGBColor(214, 39, 40);
const PATH_COLOR: RGBColor = RGBColor(31, 119, 180);
const LABEL_COLOR: RGBColor = RGBColor(44, 160, 44);
const BOUNDS_COLOR: RGBColor = RGBColor(127, 127, 127);

/// What the overlay outlined, for callers that want to log or assert on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayStats {
    pub obstacles: usize,
    pub paths: usize,
    pub labels: usize,
    pub surfaces: usize,
}

fn outline<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    b: &BBox,
    color: RGBColor,
) -> Result<()> {
    let corners = [
        (b.x_min.round() as i32, b.y_min.round() as i32),
        (b.x_max.round() as i32, b.y_max.round() as i32),
    ];
    area.draw(&Rectangle::new(corners, color.mix(0.12).filled()))
        .map_err(|e| anyhow!("{:?}", e))?;
    area.draw(&Rectangle::new(corners, color.mix(0.8).stroke_width(1)))
        .map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}

/// Outline fixed obstacles and patches (red), line paths (blue), moveable
/// labels (green) and surface bounds (gray).
pub fn draw_debug_overlay<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    registry: &ParticipationRegistry,
    surfaces: &[Surface],
) -> Result<OverlayStats> {
    let mut stats = OverlayStats::default();

    for s in surface_group(surfaces) {
        outline(area, &s.area(), BOUNDS_COLOR)?;
        stats.surfaces += 1;
    }

    for obstacle in collect_obstacles(registry, surfaces).iter() {
        match (&obstacle.shape, obstacle.source) {
            (Shape::Path { pixels, .. }, _) => {
                let pts: Vec<(i32, i32)> = pixels
                    .iter()
                    .map(|p: &Point| (p.x.round() as i32, p.y.round() as i32))
                    .collect();
                area.draw(&PathElement::new(pts, PATH_COLOR.mix(0.7).stroke_width(3)))
                    .map_err(|e| anyhow!("{:?}", e))?;
                stats.paths += 1;
            }
            (
                Shape::Rect(b),
                ObstacleSource::Fixed | ObstacleSource::Patch | ObstacleSource::Label,
            ) => {
                outline(area, b, FIXED_COLOR)?;
                stats.obstacles += 1;
            }
            (Shape::Rect(b), ObstacleSource::LinePath) => {
                outline(area, b, PATH_COLOR)?;
                stats.paths += 1;
            }
        }
    }

    for s in surfaces {
        let Some(entry) = registry.entry(s.id()) else {
            continue;
        };
        let ctx = s.transform();
        for m in &entry.moveable {
            let Some(element) = m.element.upgrade() else {
                continue;
            };
            let bbox = element.borrow().bbox(&ctx);
            outline(area, &bbox, LABEL_COLOR)?;
            stats.labels += 1;
        }
    }

    log::debug!("debug overlay: {:?}", stats);
    Ok(stats)
}
