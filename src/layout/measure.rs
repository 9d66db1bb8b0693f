//! Text measurement capability.
//!
//! The paginator never shapes text itself. It asks a [`TextMeasurer`] where
//! lines break and how tall they are, which lets a GUI plug in its real text
//! engine while the CLI, benches and tests use [`FixedAdvanceMeasurer`].

use serde::{Deserialize, Serialize};

use crate::model::TextStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    #[default]
    Serif,
    SansSerif,
    Monospace,
}

/// Resolved font for one run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub family: FontFamily,
    /// Font size in layout units.
    pub size: f32,
    /// Line height as a multiple of `size`.
    pub line_height: f32,
    pub italic: bool,
}

impl FontSpec {
    /// Distance between consecutive baselines.
    pub fn line_advance(&self) -> f32 {
        self.size * self.line_height
    }
}

/// One laid-out line.
///
/// `start..end` is a byte range into the measured text; `top` and `bottom`
/// are vertical extents relative to the top of the first line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub start: usize,
    pub end: usize,
    pub top: f32,
    pub bottom: f32,
}

impl LineMetrics {
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Line breaking and metrics oracle.
pub trait TextMeasurer: Send + Sync {
    /// Break `text` into lines no wider than `max_width`.
    fn measure(&self, text: &str, font: &FontSpec, max_width: f32) -> Vec<LineMetrics>;

    /// Height of a single line set in `font`.
    fn line_height(&self, font: &FontSpec) -> f32 {
        font.line_advance()
    }
}

/// Maps text styles to fonts around a base body size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Typography {
    pub family: FontFamily,
    pub base_size: f32,
    pub line_height: f32,
}

impl Typography {
    pub fn new(family: FontFamily, base_size: f32, line_height: f32) -> Self {
        Self {
            family,
            base_size,
            line_height,
        }
    }

    pub fn font_for(&self, style: TextStyle) -> FontSpec {
        let scale = match style {
            TextStyle::Title => 1.5,
            TextStyle::Heading => 1.2,
            TextStyle::Caption => 0.85,
            TextStyle::Body | TextStyle::Quote => 1.0,
        };
        FontSpec {
            family: self.family,
            size: self.base_size * scale,
            line_height: self.line_height,
            italic: style == TextStyle::Quote,
        }
    }
}

impl Default for Typography {
    fn default() -> Self {
        Self::new(FontFamily::Serif, 18.0, 1.6)
    }
}

/// Measures every character as the same advance width.
///
/// Wraps greedily at whitespace, breaks hard on `\n` and splits words longer
/// than a line. Trailing whitespace stays on the line it follows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAdvanceMeasurer {
    /// Character advance as a fraction of the font size.
    pub advance_em: f32,
}

impl FixedAdvanceMeasurer {
    pub fn new(advance_em: f32) -> Self {
        Self { advance_em }
    }

    fn advance(&self, font: &FontSpec) -> f32 {
        let em = match font.family {
            FontFamily::Monospace => self.advance_em.max(0.6),
            FontFamily::Serif | FontFamily::SansSerif => self.advance_em,
        };
        (font.size * em).max(f32::EPSILON)
    }
}

impl Default for FixedAdvanceMeasurer {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl TextMeasurer for FixedAdvanceMeasurer {
    fn measure(&self, text: &str, font: &FontSpec, max_width: f32) -> Vec<LineMetrics> {
        let per_line = ((max_width / self.advance(font)).floor() as usize).max(1);
        let advance = font.line_advance();

        wrap(text, per_line)
            .into_iter()
            .enumerate()
            .map(|(i, (start, end))| LineMetrics {
                start,
                end,
                top: i as f32 * advance,
                bottom: (i + 1) as f32 * advance,
            })
            .collect()
    }
}

/// Greedy wrap into byte ranges covering `text` contiguously.
fn wrap(text: &str, per_line: usize) -> Vec<(usize, usize)> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut width = 0;
    // Byte position just past the last whitespace run, and the width up to it.
    let mut last_break: Option<(usize, usize)> = None;

    for (i, c) in text.char_indices() {
        if c == '\n' {
            lines.push((start, i + 1));
            start = i + 1;
            width = 0;
            last_break = None;
            continue;
        }
        if c.is_whitespace() {
            width += 1;
            last_break = Some((i + c.len_utf8(), width));
            continue;
        }
        if width >= per_line {
            match last_break {
                Some((at, w)) if at > start => {
                    lines.push((start, at));
                    start = at;
                    width -= w;
                }
                _ => {
                    lines.push((start, i));
                    start = i;
                    width = 0;
                }
            }
            last_break = None;
        }
        width += 1;
    }

    if start < text.len() || lines.is_empty() {
        lines.push((start, text.len()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> FontSpec {
        FontSpec {
            family: FontFamily::Serif,
            size: 10.0,
            line_height: 1.5,
            italic: false,
        }
    }

    fn texts<'a>(text: &'a str, lines: &[LineMetrics]) -> Vec<&'a str> {
        lines.iter().map(|l| &text[l.start..l.end]).collect()
    }

    #[test]
    fn test_wraps_at_whitespace() {
        // 5 units per char, 50 wide: 10 chars per line.
        let m = FixedAdvanceMeasurer::new(0.5);
        let text = "the quick brown fox jumps";
        let lines = m.measure(text, &font(), 50.0);
        assert_eq!(texts(text, &lines), vec!["the quick ", "brown fox ", "jumps"]);
        assert_eq!(lines[1].top, 15.0);
        assert_eq!(lines[1].bottom, 30.0);
    }

    #[test]
    fn test_splits_overlong_word() {
        let m = FixedAdvanceMeasurer::new(0.5);
        let text = "abcdefghijklmnopqrstuvwxyz";
        let lines = m.measure(text, &font(), 50.0);
        assert_eq!(texts(text, &lines), vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
    }

    #[test]
    fn test_hard_breaks() {
        let m = FixedAdvanceMeasurer::new(0.5);
        let text = "one\ntwo\n\nthree";
        let lines = m.measure(text, &font(), 500.0);
        assert_eq!(texts(text, &lines), vec!["one\n", "two\n", "\n", "three"]);
    }

    #[test]
    fn test_multibyte_ranges_are_char_boundaries() {
        let m = FixedAdvanceMeasurer::new(0.5);
        let text = "ééééé ééééé ééééé";
        let lines = m.measure(text, &font(), 30.0);
        for line in &lines {
            assert!(text.is_char_boundary(line.start));
            assert!(text.is_char_boundary(line.end));
        }
        assert_eq!(texts(text, &lines).concat(), text);
    }

    #[test]
    fn test_typography_scales() {
        let t = Typography::new(FontFamily::SansSerif, 20.0, 1.2);
        assert_eq!(t.font_for(TextStyle::Title).size, 30.0);
        assert!((t.font_for(TextStyle::Heading).size - 24.0).abs() < 1e-4);
        assert_eq!(t.font_for(TextStyle::Body).size, 20.0);
        assert!(t.font_for(TextStyle::Quote).italic);
        assert!(t.font_for(TextStyle::Caption).size < 20.0);
    }
}
