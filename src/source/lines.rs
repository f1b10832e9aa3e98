//! Grouping positioned glyphs into text lines and cell segments.

use super::{BBox, Glyph, TextLine};

/// Baseline difference tolerated within a line, as a fraction of font size.
const LINE_TOLERANCE: f32 = 0.3;
/// Horizontal gap that separates words, as a fraction of font size.
const WORD_GAP: f32 = 0.15;
/// Horizontal gap that separates table cells, as a fraction of font size.
const CELL_GAP: f32 = 0.8;

/// A run of glyphs on one line with no cell-sized gap inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub size: f32,
}

/// Group glyphs into lines by baseline, top to bottom (bottom-left origin).
pub fn group_into_lines(mut glyphs: Vec<Glyph>) -> Vec<TextLine> {
    if glyphs.is_empty() {
        return vec![];
    }

    // Sort glyphs by baseline (descending, since PDF y is bottom-up) then x
    glyphs.sort_by(|a, b| {
        baseline(b)
            .partial_cmp(&baseline(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines = Vec::new();
    let mut current: Vec<Glyph> = Vec::new();
    let mut current_y: Option<f32> = None;

    for glyph in glyphs {
        let y = baseline(&glyph);
        match current_y {
            Some(line_y) if (y - line_y).abs() <= glyph.size * LINE_TOLERANCE => {
                current.push(glyph);
            }
            _ => {
                if !current.is_empty() {
                    lines.extend(line_from_glyphs(std::mem::take(&mut current)));
                }
                current_y = Some(y);
                current.push(glyph);
            }
        }
    }

    if !current.is_empty() {
        lines.extend(line_from_glyphs(current));
    }

    lines
}

/// Build a line from glyphs that share a baseline.
///
/// Returns `None` when there are no glyphs.
pub fn line_from_glyphs(mut glyphs: Vec<Glyph>) -> Option<TextLine> {
    glyphs.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal));

    let first = glyphs.first()?;
    let bbox = glyphs.iter().fold(
        BBox::new(first.x0, first.y0, first.x1, first.y1),
        |bbox, g| bbox.union(&BBox::new(g.x0, g.y0, g.x1, g.y1)),
    );

    Some(TextLine {
        text: join_glyphs(&glyphs),
        bbox,
        chars: glyphs,
    })
}

/// Split a line into segments wherever the gap between glyphs is cell-sized.
pub fn segments(line: &TextLine) -> Vec<Segment> {
    let mut result = Vec::new();
    let mut start = 0;

    for i in 1..=line.chars.len() {
        let split = match line.chars.get(i) {
            Some(glyph) => {
                let prev = &line.chars[i - 1];
                glyph.x0 - prev.x1 > prev.size.max(glyph.size) * CELL_GAP
            }
            None => true,
        };

        if split {
            let run = &line.chars[start..i];
            if let (Some(first), Some(last)) = (run.first(), run.last()) {
                result.push(Segment {
                    text: join_glyphs(run),
                    x0: first.x0,
                    x1: last.x1,
                    size: first.size,
                });
            }
            start = i;
        }
    }

    result
}

/// Concatenate glyph text, inserting a space at word-sized gaps.
///
/// No space is inserted between two characters of a script that does not
/// separate words with spaces.
fn join_glyphs(glyphs: &[Glyph]) -> String {
    let mut text = String::new();

    for (i, glyph) in glyphs.iter().enumerate() {
        if i > 0 {
            let prev = &glyphs[i - 1];
            let gap = glyph.x0 - prev.x1;
            let threshold = prev.size.max(glyph.size) * WORD_GAP;

            let prev_spaceless = prev
                .text
                .chars()
                .last()
                .map(is_spaceless_script_char)
                .unwrap_or(false);
            let curr_spaceless = glyph
                .text
                .chars()
                .next()
                .map(is_spaceless_script_char)
                .unwrap_or(false);

            if gap > threshold && !(prev_spaceless && curr_spaceless) && !text.ends_with(' ') {
                text.push(' ');
            }
        }
        text.push_str(&glyph.text);
    }

    text
}

fn baseline(glyph: &Glyph) -> f32 {
    glyph.y0 + glyph.height() * 0.2
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana and Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
    // Fullwidth forms
    || (0xFF00..=0xFFEF).contains(&code)
}
