use crate::config::LayoutConfig;
use crate::model::TextStyle;

use super::measure::{FontSpec, Typography};

/// Geometry and typography a pagination run is computed for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    /// Width available to text after horizontal padding.
    pub content_width: f32,
    /// Height available to a page after vertical padding.
    pub content_height: f32,
    /// Vertical gap added after each element fragment.
    pub element_spacing: f32,
    pub typography: Typography,
}

impl LayoutParams {
    pub fn new(content_width: f32, content_height: f32, typography: Typography) -> Self {
        Self {
            content_width: content_width.max(1.0),
            content_height: content_height.max(1.0),
            element_spacing: 16.0,
            typography,
        }
    }

    pub fn with_spacing(mut self, element_spacing: f32) -> Self {
        self.element_spacing = element_spacing.max(0.0);
        self
    }

    /// Content box of the configured viewport, never smaller than one unit.
    pub fn from_config(cfg: &LayoutConfig) -> Self {
        let typography = Typography::new(cfg.font_family, cfg.font_size, cfg.line_height);
        Self::new(
            cfg.viewport_width - 2.0 * cfg.horizontal_padding,
            cfg.viewport_height - 2.0 * cfg.vertical_padding,
            typography,
        )
        .with_spacing(cfg.element_spacing)
    }

    pub fn font_for(&self, style: TextStyle) -> FontSpec {
        self.typography.font_for(style)
    }

    /// Estimated height of one table row.
    pub fn table_row_height(&self) -> f32 {
        self.typography.base_size * 2.0
    }
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FontFamily;

    #[test]
    fn test_content_box_from_config() {
        let cfg = LayoutConfig {
            viewport_width: 400.0,
            viewport_height: 600.0,
            horizontal_padding: 20.0,
            vertical_padding: 10.0,
            font_family: FontFamily::Monospace,
            ..LayoutConfig::default()
        };
        let params = LayoutParams::from_config(&cfg);
        assert_eq!(params.content_width, 360.0);
        assert_eq!(params.content_height, 580.0);
        assert_eq!(params.typography.family, FontFamily::Monospace);
        assert_eq!(params.table_row_height(), 36.0);
    }

    #[test]
    fn test_content_box_never_collapses() {
        let cfg = LayoutConfig {
            viewport_width: 10.0,
            viewport_height: 10.0,
            ..LayoutConfig::default()
        };
        let params = LayoutParams::from_config(&cfg);
        assert_eq!(params.content_width, 1.0);
        assert_eq!(params.content_height, 1.0);
    }
}
