//! Plotpaint configuration system
//!
//! This crate provides centralized configuration management for Plotpaint,
//! loading settings from `plotpaint.toml` with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure for Plotpaint
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlotpaintConfig {
    /// Rasterization settings consumed by the renderer
    pub render: RenderConfig,
    /// Font settings
    pub text: TextConfig,
    /// Output settings for the demo driver
    pub output: OutputConfig,
}

/// Renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Dots per inch used to convert point sizes to device pixels
    pub dpi: f64,
    /// Path simplification threshold; also sets the marker subpixel grid (ceil(1/threshold))
    pub simplify_threshold: f64,
    /// Allow the subpixel raster cache when stamping many markers
    pub marker_cache: bool,
    /// Allow collapsing solid circle markers into round-capped dots
    pub circle_fast_path: bool,
    /// Default antialiasing for new surfaces
    pub antialias: bool,
}

/// Text rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Font file used when a requested style cannot be resolved
    pub font: Option<PathBuf>,
    /// Family queried when a style names no family
    pub default_family: String,
}

/// Output configuration for the demo driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
    /// Destination PNG
    pub path: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: 100.0,
            simplify_threshold: 1.0 / 9.0,
            marker_cache: true,
            circle_fast_path: true,
            antialias: true,
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font: None,
            default_family: "sans-serif".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            path: PathBuf::from("plotpaint.png"),
        }
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

impl PlotpaintConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from the default location (plotpaint.toml in the current directory)
    /// or return default configuration if file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file("plotpaint.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Ok(val) = std::env::var("PLOTPAINT_DPI") {
            if let Ok(dpi) = val.parse::<f64>() {
                self.render.dpi = dpi;
            }
        }
        if let Ok(val) = std::env::var("PLOTPAINT_SIMPLIFY_THRESHOLD") {
            if let Ok(threshold) = val.parse::<f64>() {
                self.render.simplify_threshold = threshold;
            }
        }
        if let Ok(val) = std::env::var("PLOTPAINT_MARKER_CACHE") {
            self.render.marker_cache = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("PLOTPAINT_CIRCLE_FAST_PATH") {
            self.render.circle_fast_path = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("PLOTPAINT_ANTIALIAS") {
            self.render.antialias = parse_flag(&val);
        }

        if let Ok(font) = std::env::var("PLOTPAINT_FONT") {
            self.text.font = Some(PathBuf::from(font));
        }

        if let Ok(path) = std::env::var("PLOTPAINT_OUTPUT") {
            self.output.path = PathBuf::from(path);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from plotpaint.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
