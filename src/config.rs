//! Reader configuration loaded from TOML.
//!
//! Every field has a default, so a partial file (or none at all) still yields
//! a usable configuration. Values are clamped to the ranges a reader UI
//! allows before they reach the layout engine.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::layout::FontFamily;

pub const FONT_SIZE_RANGE: (f32, f32) = (12.0, 40.0);
pub const PADDING_RANGE: (f32, f32) = (8.0, 48.0);
pub const LINE_HEIGHT_RANGE: (f32, f32) = (1.0, 2.5);
pub const WPM_RANGE: (u32, u32) = (100, 1500);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub layout: LayoutConfig,
    pub rsvp: RsvpConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub horizontal_padding: f32,
    pub vertical_padding: f32,
    pub font_size: f32,
    pub font_family: FontFamily,
    pub line_height: f32,
    pub element_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            viewport_width: 400.0,
            viewport_height: 700.0,
            horizontal_padding: 24.0,
            vertical_padding: 16.0,
            font_size: 18.0,
            font_family: FontFamily::Serif,
            line_height: 1.6,
            element_spacing: 16.0,
        }
    }
}

impl LayoutConfig {
    pub fn clamp(&mut self) {
        let clamp = |v: f32, (lo, hi): (f32, f32)| if v.is_nan() { lo } else { v.clamp(lo, hi) };
        self.font_size = clamp(self.font_size, FONT_SIZE_RANGE);
        self.horizontal_padding = clamp(self.horizontal_padding, PADDING_RANGE);
        self.vertical_padding = clamp(self.vertical_padding, PADDING_RANGE);
        self.line_height = clamp(self.line_height, LINE_HEIGHT_RANGE);
        self.element_spacing = self.element_spacing.max(0.0);
        self.viewport_width = self.viewport_width.max(1.0);
        self.viewport_height = self.viewport_height.max(1.0);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsvpConfig {
    pub wpm: u32,
}

impl Default for RsvpConfig {
    fn default() -> Self {
        Self { wpm: 300 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pagination worker threads; 0 lets rayon decide.
    pub pagination_threads: usize,
    /// Layout requests arriving within this window are coalesced.
    pub debounce_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pagination_threads: 0,
            debounce_ms: 150,
        }
    }
}

impl ReaderConfig {
    /// Clamp every field into its allowed range.
    pub fn clamped(mut self) -> Self {
        self.layout.clamp();
        self.rsvp.wpm = self.rsvp.wpm.clamp(WPM_RANGE.0, WPM_RANGE.1);
        self
    }
}

/// Load configuration from `path`, falling back to defaults on error.
pub fn load_config(path: &Path) -> ReaderConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded reader config");
            data
        }
        Err(err) => {
            warn!(path = %path.display(), "Falling back to default config: {err}");
            return ReaderConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!(?cfg, "Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            ReaderConfig::default()
        }
    }
}

/// Parse and clamp a TOML configuration.
pub fn parse_config(contents: &str) -> Result<ReaderConfig> {
    let cfg: ReaderConfig = toml::from_str(contents)?;
    Ok(cfg.clamped())
}

pub fn serialize_config(config: &ReaderConfig) -> std::result::Result<String, toml::ser::Error> {
    toml::to_string(config)
}
