//! Public types for the chart pipeline.

use serde::Serialize;

use crate::collision::{Connector, ResolveReport};
use crate::config::CollisionConfig;

/// Default moving-average windows drawn when none are requested.
pub const DEFAULT_MOVING_AVERAGES: [usize; 2] = [20, 50];

/// Everything `plot_annotated` needs besides the data.
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    /// Caption; defaults to the series symbol.
    pub title: Option<String>,
    /// Locale tag for tick and label numbers (see `util::map_locale`).
    pub locale: String,
    /// Trailing moving-average windows, each drawn as a line path.
    pub moving_averages: Vec<usize>,
    /// Add a volume panel on a twin surface sharing the date axis.
    pub volume: bool,
    /// Trailing window, in observations, shaded as the recent-period band.
    pub recent_window: usize,
    /// Draw the collision debug overlay.
    pub debug: bool,
    pub collision: CollisionConfig,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            title: None,
            locale: "en".to_string(),
            moving_averages: DEFAULT_MOVING_AVERAGES.to_vec(),
            volume: false,
            recent_window: 20,
            debug: false,
            collision: CollisionConfig::default(),
        }
    }
}

/// Where one annotation label ended up, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelPlacement {
    pub text: String,
    pub anchor_px: [f64; 2],
    pub resolved_px: [f64; 2],
    /// Pixel distance between anchor and resolved position.
    pub displacement: f64,
}

/// Outcome of rendering one chart.
#[derive(Debug, Clone, Serialize)]
pub struct ChartReport {
    pub resolve: ResolveReport,
    pub placements: Vec<LabelPlacement>,
    /// Connectors drawn for labels displaced beyond the threshold.
    pub connectors: usize,
    #[serde(skip)]
    pub connector_lines: Vec<Connector>,
}
