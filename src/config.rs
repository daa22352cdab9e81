//! Collision engine configuration.
//!
//! Everything is read once per resolution pass; nothing is cached across
//! passes. Configs can be built in code, deserialized from JSON, or adjusted
//! from CLI flags.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a [`CollisionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown movement axis `{0}` (expected x, y or xy)")]
    UnknownMovement(String),
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Axes along which labels may be displaced.
///
/// `Y` is the default: on time-indexed charts a horizontal shift would move a
/// label away from its date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    X,
    #[default]
    Y,
    XY,
}

impl Movement {
    pub fn allows_x(self) -> bool {
        matches!(self, Movement::X | Movement::XY)
    }

    pub fn allows_y(self) -> bool {
        matches!(self, Movement::Y | Movement::XY)
    }
}

impl FromStr for Movement {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Movement::X),
            "y" => Ok(Movement::Y),
            "xy" | "yx" => Ok(Movement::XY),
            other => Err(ConfigError::UnknownMovement(other.to_string())),
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Movement::X => "x",
            Movement::Y => "y",
            Movement::XY => "xy",
        })
    }
}

/// Look of the guide line drawn from a displaced label back to its anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorStyle {
    /// Minimum displacement in pixels; a connector is drawn only beyond it.
    pub threshold: f64,
    pub opacity: f64,
    /// `[dash, gap]` in pixels; `None` draws a solid line.
    pub dash: Option<[u32; 2]>,
    pub width: u32,
    pub color: [u8; 3],
}

impl Default for ConnectorStyle {
    fn default() -> Self {
        Self {
            threshold: 12.0,
            opacity: 0.6,
            dash: Some([4, 3]),
            width: 1,
            color: [99, 99, 99],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub movement: Movement,
    /// Clearance kept between a label and any obstacle, in pixels.
    pub obstacle_padding: f64,
    /// Clearance kept between two labels, in pixels.
    pub label_padding: f64,
    /// Hard cap on outer resolution passes.
    pub max_iterations: usize,
    pub connector: ConnectorStyle,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            movement: Movement::Y,
            obstacle_padding: 4.0,
            label_padding: 4.0,
            max_iterations: 50,
            connector: ConnectorStyle::default(),
        }
    }
}

impl CollisionConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: CollisionConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn non_negative(field: &'static str, v: f64) -> Result<(), ConfigError> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("expected a finite value >= 0, got {v}"),
                })
            }
        }
        non_negative("obstacle_padding", self.obstacle_padding)?;
        non_negative("label_padding", self.label_padding)?;
        non_negative("connector.threshold", self.connector.threshold)?;
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                field: "max_iterations",
                reason: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.connector.opacity) {
            return Err(ConfigError::Invalid {
                field: "connector.opacity",
                reason: format!("expected 0..=1, got {}", self.connector.opacity),
            });
        }
        Ok(())
    }
}
