#![forbid(unsafe_code)]

//! Tunables for gesture recognition, placement and edge auto-scroll.
//!
//! Every threshold the engine uses lives in [`ReorderConfig`] so it can be
//! loaded from TOML or JSON instead of being edited in algorithm code.
//!
//! ```toml
//! # tilesort.toml
//! long_press_delay_ms = 400
//! grid_throttle_ms = 100
//! ```
//!
//! ```rust,ignore
//! let config = ReorderConfig::from_toml_file("tilesort.toml")?;
//! ```
//!
//! Fields absent from the source keep the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Touch press must be held this long before a drag activates.
pub const DEFAULT_LONG_PRESS_DELAY_MS: u64 = 300;
/// Movement from the press origin that cancels a pending touch press.
pub const DEFAULT_TOUCH_MOVE_TOLERANCE_PX: f64 = 15.0;
/// Scale applied to an item while a touch press is pending.
pub const DEFAULT_PRESS_SCALE: f64 = 0.95;
/// Two grid items share a row when their top edges differ by at most this.
pub const DEFAULT_GRID_ROW_TOLERANCE_PX: f64 = 25.0;
/// Vertical slack added above and below an item when matching the pointer row.
pub const DEFAULT_GRID_ROW_MARGIN_PX: f64 = 10.0;
/// Minimum wall-clock gap between grid placement recomputations.
pub const DEFAULT_GRID_THROTTLE_MS: u64 = 150;
/// Minimum wall-clock gap between carousel placement recomputations.
pub const DEFAULT_CAROUSEL_THROTTLE_MS: u64 = 50;
/// Distance from a scroll edge inside which auto-scroll engages.
pub const DEFAULT_EDGE_SCROLL_THRESHOLD_PX: f64 = 120.0;
/// Auto-scroll speed at the outer boundary of the edge band, px per frame.
pub const DEFAULT_EDGE_SCROLL_MIN_SPEED: f64 = 3.0;
/// Auto-scroll speed at the edge itself, px per frame.
pub const DEFAULT_EDGE_SCROLL_MAX_SPEED: f64 = 15.0;

/// Timing and distance thresholds for the reorder engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderConfig {
    pub long_press_delay_ms: u64,
    pub touch_move_tolerance_px: f64,
    /// Visual scale while a touch press is pending, in `(0, 1]`.
    pub press_scale: f64,
    pub grid_row_tolerance_px: f64,
    pub grid_row_margin_px: f64,
    pub grid_throttle_ms: u64,
    pub carousel_throttle_ms: u64,
    pub edge_scroll_threshold_px: f64,
    pub edge_scroll_min_speed: f64,
    pub edge_scroll_max_speed: f64,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            long_press_delay_ms: DEFAULT_LONG_PRESS_DELAY_MS,
            touch_move_tolerance_px: DEFAULT_TOUCH_MOVE_TOLERANCE_PX,
            press_scale: DEFAULT_PRESS_SCALE,
            grid_row_tolerance_px: DEFAULT_GRID_ROW_TOLERANCE_PX,
            grid_row_margin_px: DEFAULT_GRID_ROW_MARGIN_PX,
            grid_throttle_ms: DEFAULT_GRID_THROTTLE_MS,
            carousel_throttle_ms: DEFAULT_CAROUSEL_THROTTLE_MS,
            edge_scroll_threshold_px: DEFAULT_EDGE_SCROLL_THRESHOLD_PX,
            edge_scroll_min_speed: DEFAULT_EDGE_SCROLL_MIN_SPEED,
            edge_scroll_max_speed: DEFAULT_EDGE_SCROLL_MAX_SPEED,
        }
    }
}

impl ReorderConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Check every field is within its usable range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.long_press_delay_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "long_press_delay_ms",
                reason: "must be > 0".into(),
            });
        }
        positive("touch_move_tolerance_px", self.touch_move_tolerance_px)?;
        if !(self.press_scale > 0.0 && self.press_scale <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "press_scale",
                reason: format!("must be in (0, 1], got {}", self.press_scale),
            });
        }
        non_negative("grid_row_tolerance_px", self.grid_row_tolerance_px)?;
        non_negative("grid_row_margin_px", self.grid_row_margin_px)?;
        positive("edge_scroll_threshold_px", self.edge_scroll_threshold_px)?;
        positive("edge_scroll_min_speed", self.edge_scroll_min_speed)?;
        positive("edge_scroll_max_speed", self.edge_scroll_max_speed)?;
        if self.edge_scroll_min_speed > self.edge_scroll_max_speed {
            return Err(ConfigError::Invalid {
                field: "edge_scroll_min_speed",
                reason: format!(
                    "must not exceed edge_scroll_max_speed ({} > {})",
                    self.edge_scroll_min_speed, self.edge_scroll_max_speed
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn long_press_delay(&self) -> Duration {
        Duration::from_millis(self.long_press_delay_ms)
    }

    #[must_use]
    pub fn grid_throttle(&self) -> Duration {
        Duration::from_millis(self.grid_throttle_ms)
    }

    #[must_use]
    pub fn carousel_throttle(&self) -> Duration {
        Duration::from_millis(self.carousel_throttle_ms)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be > 0, got {value}"),
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be >= 0, got {value}"),
        })
    }
}

/// Errors from loading or validating a [`ReorderConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
