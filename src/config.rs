//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/tabtangle/config.json`.
//! Every section is optional and every knob falls back to a compiled-in
//! default, so the tuning constants (burst size, jitter ranges, score and
//! wave thresholds) can be adjusted without touching code.
//!
//! # Example
//!
//! ```json
//! {
//!   "layout": { "settle_delay_ms": 600 },
//!   "chaos": { "floor_width": 450, "burst_size": 20 },
//!   "gestures": { "source": "landmarks", "wave_threshold": 0.3 },
//!   "pages": { "camera": "camera.html" }
//! }
//! ```

use crate::command::Bounds;
use crate::gesture::GestureConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
///
/// Every field is optional: a minimal `{}` file is valid and all sections
/// fall back to their compiled-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Grid tiling settings.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Shrink / burst tuning.
    #[serde(default)]
    pub chaos: ChaosConfig,

    /// Gesture recognition settings.
    #[serde(default)]
    pub gestures: GestureConfig,

    /// Extension pages opened by the daemon.
    #[serde(default)]
    pub pages: PageConfig,
}

/// Grid tiling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// How long to wait after un-maximizing windows before measuring (ms).
    pub settle_delay_ms: u64,
    /// Work area used when the host cannot report displays.
    pub fallback_work_area: Bounds,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 600,
            fallback_work_area: Bounds::new(0, 0, 1500, 900),
        }
    }
}

/// Shrink / burst tuning.
///
/// Durations are in **milliseconds**; `0` disables the pause.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    /// Window size after a reset.
    pub base_width: u32,
    pub base_height: u32,
    /// A shrink that would land at or below this width bursts instead.
    pub floor_width: u32,
    /// Factor applied to both dimensions per shrink step.
    pub shrink_ratio: f64,
    /// Shrunk windows land at `offset + [0, jitter)` from the work-area origin.
    pub jitter_x: u32,
    pub jitter_y: u32,
    pub jitter_offset: u32,
    /// Number of junk popups per burst.
    pub burst_size: usize,
    /// Junk popup sizes are drawn from `[min, max)`.
    pub burst_min_width: u32,
    pub burst_max_width: u32,
    pub burst_min_height: u32,
    pub burst_max_height: u32,
    /// Junk popup positions are drawn from `[0, spread)` from the origin.
    pub burst_spread_x: u32,
    pub burst_spread_y: u32,
    /// Pause between junk popups.
    pub spawn_delay_ms: u64,
    /// Pause between tabs in the bulk chaos pass.
    pub deal_delay_ms: u64,
    /// Pause between closures when clearing chaos.
    pub close_delay_ms: u64,
    /// Cascade step between junk windows following the pointer (pixels).
    pub follow_cascade: i32,
    /// Fixed RNG seed; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            base_width: 1000,
            base_height: 800,
            floor_width: 400,
            shrink_ratio: 0.9,
            jitter_x: 900,
            jitter_y: 600,
            jitter_offset: 50,
            burst_size: 10,
            burst_min_width: 400,
            burst_max_width: 1000,
            burst_min_height: 300,
            burst_max_height: 800,
            burst_spread_x: 800,
            burst_spread_y: 500,
            spawn_delay_ms: 100,
            deal_delay_ms: 150,
            close_delay_ms: 200,
            follow_cascade: 24,
            seed: None,
        }
    }
}

/// Extension pages opened by the daemon.
///
/// Pages are matched by substring against tab URLs, so a relative name
/// (`"camera.html"`) matches `chrome-extension://<id>/camera.html`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Decorative page loaded by junk popups.
    pub filler: String,
    /// Camera / gesture page; its window is never closed by clear-chaos.
    pub camera: String,
    /// Preferred camera window size, clamped to the work area.
    pub camera_width: u32,
    pub camera_height: u32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            filler: "gif.html".into(),
            camera: "camera.html".into(),
            camera_width: 960,
            camera_height: 1080,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the shrink or burst arithmetic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.chaos;
        if !(c.shrink_ratio > 0.0 && c.shrink_ratio < 1.0) {
            return Err(ConfigError(format!(
                "chaos.shrink_ratio must be in (0, 1), got {}",
                c.shrink_ratio
            )));
        }
        if c.base_width <= c.floor_width || c.base_height == 0 {
            return Err(ConfigError(format!(
                "chaos.base_width ({}) must exceed chaos.floor_width ({})",
                c.base_width, c.floor_width
            )));
        }
        if c.burst_min_width >= c.burst_max_width || c.burst_min_height >= c.burst_max_height {
            return Err(ConfigError("chaos burst size ranges must be non-empty".into()));
        }
        Ok(())
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
