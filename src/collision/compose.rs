//! Composition across surfaces that share the x dimension (dual-axis
//! charts): all their labels are resolved as one pool against the union of
//! their obstacles.

use super::obstacles::surface_group;
use super::registry::ParticipationRegistry;
use super::resolver::{ResolveReport, resolve};
use super::surface::Surface;
use crate::config::CollisionConfig;

/// `primary` followed by its live siblings in creation order.
pub fn composed_surfaces(primary: &Surface) -> Vec<Surface> {
    let mut out = vec![primary.clone()];
    out.extend(primary.siblings());
    out
}

/// Resolve one surface on its own. Obstacles still include x-sharing
/// siblings, and their labels are pinned in place as obstacles; only this
/// surface's labels move.
pub fn resolve_surface(
    registry: &ParticipationRegistry,
    surface: &Surface,
    config: &CollisionConfig,
) -> ResolveReport {
    resolve(registry, std::slice::from_ref(surface), config)
}

/// Resolve `primary` and all its siblings as a single label pool.
pub fn resolve_composed(
    registry: &ParticipationRegistry,
    primary: &Surface,
    config: &CollisionConfig,
) -> ResolveReport {
    let surfaces = composed_surfaces(primary);
    log::debug!(
        "composing {} surface(s) ({} in obstacle group)",
        surfaces.len(),
        surface_group(&surfaces).len()
    );
    resolve(registry, &surfaces, config)
}
