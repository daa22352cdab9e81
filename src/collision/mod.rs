//! Label collision resolution engine.
//!
//! Renderers create visual elements, classify them in a
//! [`ParticipationRegistry`] and hand the surfaces to [`resolve`] (or
//! [`resolve_and_render`], which also draws connectors and the optional
//! debug overlay). Moveable labels are repositioned in place so that none
//! overlap each other, fixed obstacles, bars or line paths.
//!
//! - Geometry is in display pixels; data coordinates go through each
//!   surface's [`CoordTransform`].
//! - Only vertical movement is allowed by default (see [`Movement`]).
//! - Resolution is greedy and bounded by `max_iterations`; trapped labels
//!   stay where they are.
//!
//! [`Movement`]: crate::config::Movement

pub mod compose;
pub mod connector;
pub mod debug;
pub mod element;
pub mod geometry;
pub mod obstacles;
pub mod registry;
pub mod resolver;
pub mod surface;

pub use compose::{composed_surfaces, resolve_composed, resolve_surface};
pub use connector::{Connector, ConnectorGroup, draw_connectors, plan_connectors};
pub use debug::{OverlayStats, draw_debug_overlay};
pub use element::{Boundable, ElementKey, PathGeometry, Positionable, Shared, shared};
pub use geometry::{BBox, Point};
pub use obstacles::{Obstacle, ObstacleSet, ObstacleSource, collect_obstacles, pinned_labels};
pub use registry::{Category, ParticipationRegistry};
pub use resolver::{Direction, ResolveReport, resolve};
pub use surface::{CoordTransform, Surface, SurfaceId};

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::config::CollisionConfig;

/// What one full engine pass produced.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub report: ResolveReport,
    /// Connectors drawn, across all surface groups.
    pub connectors: Vec<Connector>,
    /// Set when the debug overlay was drawn.
    pub overlay: Option<OverlayStats>,
}

/// Full engine pass for one chart: resolve `surfaces` as one pool, draw
/// connectors for labels moved beyond the threshold, then the debug overlay
/// when `debug` is set.
///
/// Only drawing can fail; an unresolvable layout is reported, not raised.
pub fn resolve_and_render<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    registry: &ParticipationRegistry,
    surfaces: &[Surface],
    config: &CollisionConfig,
    debug: bool,
) -> Result<RenderOutcome> {
    let report = resolve(registry, surfaces, config);
    let groups = plan_connectors(registry, surfaces, config.connector.threshold);
    let drawn = draw_connectors(area, &groups, &config.connector)?;
    log::debug!("drew {drawn} connector(s) over {} surface group(s)", groups.len());
    let overlay = if debug {
        Some(draw_debug_overlay(area, registry, surfaces)?)
    } else {
        None
    };
    Ok(RenderOutcome {
        report,
        connectors: groups
            .into_values()
            .flat_map(|g| g.connectors)
            .collect(),
        overlay,
    })
}
