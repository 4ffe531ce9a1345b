//! Editor configuration
//!
//! Every field has a default, so a config file only needs the keys it
//! changes. Configuration can be loaded from a JSON file, from environment
//! variables, or built programmatically with the `with_*` setters.

use crate::coords::DocRect;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the grid pitch
pub const ENV_GRID_SIZE: &str = "SIGPLACE_GRID_SIZE";
/// Environment variable overriding the render debounce, in milliseconds
pub const ENV_DEBOUNCE_MS: &str = "SIGPLACE_DEBOUNCE_MS";
/// Environment variable overriding the device pixel ratio
pub const ENV_DEVICE_PIXEL_RATIO: &str = "SIGPLACE_DEVICE_PIXEL_RATIO";

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Geometry given to newly added signatures, in document units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementDefaults {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for PlacementDefaults {
    fn default() -> Self {
        Self { x: 100.0, y: 100.0, width: 200.0, height: 100.0 }
    }
}

impl PlacementDefaults {
    pub fn rect(&self) -> DocRect {
        DocRect::new(self.x, self.y, self.width, self.height)
    }
}

/// Configuration for the placement editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Grid pitch in document units
    pub grid_size: f32,

    /// Draw the grid on the overlay
    pub show_grid: bool,

    /// Snap dropped signatures to the grid
    pub snap_to_grid: bool,

    /// Quiet period before a zoom or resize triggers a render
    pub debounce_ms: u64,

    /// Backing-store pixels per screen unit
    pub device_pixel_ratio: f32,

    /// Container width used until the host reports one
    pub fallback_container_width: f32,

    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,

    /// Device rows rasterized per render step
    pub band_rows: u32,

    /// Selection handle edge length in screen units
    pub handle_size: f32,

    /// Opacity of the signature being dragged
    pub drag_opacity: f32,

    pub new_signature: PlacementDefaults,

    /// Pull stored signatures onto the page once its size is known
    pub clamp_on_load: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: 20.0,
            show_grid: false,
            snap_to_grid: false,
            debounce_ms: 300,
            device_pixel_ratio: 1.0,
            fallback_container_width: 800.0,
            min_zoom: 0.5,
            max_zoom: 3.0,
            zoom_step: 0.1,
            band_rows: 64,
            handle_size: 8.0,
            drag_opacity: 0.8,
            new_signature: PlacementDefaults::default(),
            clamp_on_load: true,
        }
    }
}

impl EditorConfig {
    /// Loads configuration from a JSON file.
    ///
    /// Missing keys keep their defaults:
    /// ```json
    /// { "grid_size": 10, "snap_to_grid": true }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the defaults with environment overrides applied.
    ///
    /// - `SIGPLACE_GRID_SIZE`: grid pitch (default: 20)
    /// - `SIGPLACE_DEBOUNCE_MS`: render debounce (default: 300)
    /// - `SIGPLACE_DEVICE_PIXEL_RATIO`: device pixel ratio (default: 1)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Applies environment overrides on top of this configuration
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_GRID_SIZE) {
            self.grid_size = parse_var(ENV_GRID_SIZE, &value)?;
        }
        if let Some(value) = lookup(ENV_DEBOUNCE_MS) {
            self.debounce_ms = parse_var(ENV_DEBOUNCE_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_DEVICE_PIXEL_RATIO) {
            self.device_pixel_ratio = parse_var(ENV_DEVICE_PIXEL_RATIO, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.grid_size) {
            return Err(ConfigError::InvalidValue(format!("grid_size {}", self.grid_size)));
        }
        if !positive(self.device_pixel_ratio) {
            return Err(ConfigError::InvalidValue(format!(
                "device_pixel_ratio {}",
                self.device_pixel_ratio
            )));
        }
        if !positive(self.min_zoom) || self.max_zoom < self.min_zoom {
            return Err(ConfigError::InvalidValue(format!(
                "zoom range {}..{}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !positive(self.zoom_step) {
            return Err(ConfigError::InvalidValue(format!("zoom_step {}", self.zoom_step)));
        }
        if self.band_rows == 0 {
            return Err(ConfigError::InvalidValue("band_rows 0".to_owned()));
        }
        if !(0.0..=1.0).contains(&self.drag_opacity) {
            return Err(ConfigError::InvalidValue(format!("drag_opacity {}", self.drag_opacity)));
        }
        let placement = self.new_signature;
        if !positive(placement.width) || !positive(placement.height) {
            return Err(ConfigError::InvalidValue(format!(
                "new_signature size {}x{}",
                placement.width, placement.height
            )));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Clamp a zoom level to the configured range
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    pub fn with_grid(mut self, grid_size: f32, show: bool, snap: bool) -> Self {
        self.grid_size = grid_size;
        self.show_grid = show;
        self.snap_to_grid = snap;
        self
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_device_pixel_ratio(mut self, ratio: f32) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }

    pub fn with_band_rows(mut self, band_rows: u32) -> Self {
        self.band_rows = band_rows;
        self
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{key}={value}")))
}
