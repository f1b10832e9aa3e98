//! Paragraph boundary detection and style inference.

use crate::model::{Color, TextContent, TextStyle};
use crate::source::{Glyph, TextLine};

use super::frequency::{most_common, most_common_f32};

/// Characters that end a sentence, and therefore a paragraph line.
const TERMINATORS: [char; 8] = ['.', '"', '”', '?', '。', '!', '；', ';'];

/// Font size used when a paragraph has no glyphs.
const FALLBACK_SIZE: f32 = 24.0;
/// Glyph height used when a paragraph has no glyphs.
const FALLBACK_HEIGHT: f32 = 24.0;
/// Line leading relative to the modal glyph height.
const LEADING_FACTOR: f32 = 1.2;

/// Whether `line` ends its paragraph.
///
/// A line is a paragraph tail when it stops short of `width_ratio` of the
/// page width, ends with a sentence terminator, or is the page's last line.
pub fn is_paragraph_tail(line: &TextLine, page_width: f32, width_ratio: f32, last: bool) -> bool {
    if last {
        return true;
    }
    if page_width > 0.0 && line.bbox.x1 / page_width < width_ratio {
        return true;
    }
    line.text
        .trim_end()
        .chars()
        .last()
        .map(|c| TERMINATORS.contains(&c))
        .unwrap_or(false)
}

/// Build a text block from the lines of one paragraph.
///
/// Returns `None` for an empty paragraph.
pub fn build_paragraph(lines: &[&TextLine], left_margin: f32) -> Option<TextContent> {
    if lines.is_empty() {
        return None;
    }

    let text = lines
        .iter()
        .map(|line| line.text.trim())
        .collect::<Vec<_>>()
        .join(" ");

    let glyphs = || lines.iter().flat_map(|line| line.chars.iter());
    let first = lines[0].chars.first();

    let font_size = most_common_f32(glyphs().map(|g| g.size)).unwrap_or(FALLBACK_SIZE);
    let height = most_common_f32(glyphs().map(Glyph::height)).unwrap_or(FALLBACK_HEIGHT);
    let color = most_common(glyphs().map(|g| g.color)).unwrap_or(Color::BLACK);
    let bold = most_common(glyphs().map(|g| g.font.as_str()))
        .map(|font| font.to_lowercase().contains("bold"))
        .unwrap_or(false);

    let first_line_indent = first.map(|g| (g.x0 - left_margin).max(0.0)).unwrap_or(0.0);
    let anchor = first.map(|g| g.y0).unwrap_or(lines[0].bbox.y0);

    let style = TextStyle {
        font_size,
        bold,
        leading: height * LEADING_FACTOR,
        first_line_indent,
        color,
        ..TextStyle::default()
    };

    Some(TextContent::new(text, anchor, style))
}
