//! Runtime configuration
//!
//! Everything has a default; a JSON file only needs the keys it changes.

use std::time::Duration;

use serde::Deserialize;

use crate::document::FontName;
use crate::errors::{PluginError, SourceContext};
use crate::layout::defaults;

/// Environment variable overriding [`Config::transform_timeout_ms`]
pub const TIMEOUT_ENV: &str = "SPIRALGEN_TRANSFORM_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long a delegated transform may take before the caller gives up
    pub transform_timeout_ms: u64,
    /// Largest width or height accepted for a placed image
    pub max_image_dimension: u32,
    /// Font for text nodes the plugin creates itself
    pub default_font: FontName,
    pub layout: LayoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            transform_timeout_ms: 30_000,
            max_image_dimension: 4096,
            default_font: FontName::new("Inter", "Regular"),
            layout: LayoutConfig::default(),
        }
    }
}

impl Config {
    /// Parse a JSON config; `name` labels diagnostics.
    pub fn from_json(name: &str, source: &str) -> Result<Self, PluginError> {
        let ctx = SourceContext::new(name, source);
        serde_json::from_str(source).map_err(|e| ctx.json_error(&e))
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup. Unparseable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(ms) = lookup(TIMEOUT_ENV).and_then(|v| v.trim().parse().ok()) {
            self.transform_timeout_ms = ms;
        }
        self
    }

    pub fn transform_timeout(&self) -> Duration {
        Duration::from_millis(self.transform_timeout_ms)
    }
}

/// Constants of the spiral generation run
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub shape_footprint: f64,
    pub angle_step: f64,
    pub opacity_decay: f64,
    pub count_decay: f64,
    pub terminal_count: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            shape_footprint: defaults::SHAPE_FOOTPRINT,
            angle_step: defaults::ANGLE_STEP,
            opacity_decay: defaults::OPACITY_DECAY,
            count_decay: defaults::COUNT_DECAY,
            terminal_count: defaults::TERMINAL_COUNT,
        }
    }
}
