//! Content stream interpreter.
//!
//! Walks the operators of a page content stream, tracking the graphics and
//! text state, and records every shown character as a positioned [`Glyph`]
//! and every painted XObject as an [`ImagePlacement`].

use std::collections::HashMap;

use super::backend::{ContentOp, FontMetrics, PdfValue};
use super::{BBox, Glyph};
use crate::model::Color;

/// Fraction of the font size below the baseline covered by a glyph box.
const DESCENT: f32 = 0.2;
/// Fraction of the font size above the baseline covered by a glyph box.
const ASCENT: f32 = 0.8;

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub(crate) const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub(crate) const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    fn from_operands(values: &[f32]) -> Option<Self> {
        match values {
            [a, b, c, d, e, f, ..] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    /// `self` followed by `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of the transformed unit y vector.
    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Where an XObject was painted on the page.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImagePlacement {
    pub name: Vec<u8>,
    pub bbox: BBox,
}

/// Glyphs and image placements recovered from one content stream.
#[derive(Debug, Default)]
pub(crate) struct PageMarks {
    pub glyphs: Vec<Glyph>,
    pub images: Vec<ImagePlacement>,
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: Color,
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill: Color::BLACK,
            font: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Interprets content stream operators for one page.
pub(crate) struct Interpreter<'a> {
    fonts: &'a HashMap<Vec<u8>, FontMetrics>,
    decode: &'a dyn Fn(&[u8], &[u8]) -> String,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    marks: PageMarks,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter over a page's font table.
    ///
    /// `decode` maps (font resource name, string bytes) to Unicode text.
    pub(crate) fn new(
        fonts: &'a HashMap<Vec<u8>, FontMetrics>,
        decode: &'a dyn Fn(&[u8], &[u8]) -> String,
    ) -> Self {
        Self {
            fonts,
            decode,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            marks: PageMarks::default(),
        }
    }

    /// Run every operation and return what was painted.
    pub(crate) fn run(mut self, ops: &[ContentOp]) -> PageMarks {
        for op in ops {
            self.apply(op);
        }
        self.marks
    }

    fn apply(&mut self, op: &ContentOp) {
        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(&op.numbers()) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.state.font = Some(name.clone());
                }
                if let Some(size) = op.number(1) {
                    self.state.font_size = size;
                }
            }
            "Tc" => self.state.char_spacing = op.number(0).unwrap_or(0.0),
            "Tw" => self.state.word_spacing = op.number(0).unwrap_or(0.0),
            "Tz" => self.state.horizontal_scale = op.number(0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.leading = op.number(0).unwrap_or(0.0),
            "Ts" => self.state.rise = op.number(0).unwrap_or(0.0),
            "Td" => {
                let (tx, ty) = (op.number(0).unwrap_or(0.0), op.number(1).unwrap_or(0.0));
                self.move_line(tx, ty);
            }
            "TD" => {
                let (tx, ty) = (op.number(0).unwrap_or(0.0), op.number(1).unwrap_or(0.0));
                self.state.leading = -ty;
                self.move_line(tx, ty);
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(&op.numbers()) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            PdfValue::Str(bytes) => self.show(bytes),
                            PdfValue::Integer(_) | PdfValue::Real(_) => {
                                let adjust = super::backend::get_number_from_value(item)
                                    .unwrap_or(0.0);
                                let tx = -adjust / 1000.0
                                    * self.state.font_size
                                    * self.state.horizontal_scale;
                                self.advance(tx);
                            }
                            _ => {}
                        }
                    }
                }
            }
            "'" => {
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                self.state.word_spacing = op.number(0).unwrap_or(self.state.word_spacing);
                self.state.char_spacing = op.number(1).unwrap_or(self.state.char_spacing);
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                    self.show(bytes);
                }
            }
            "g" => {
                if let Some(level) = op.number(0) {
                    self.state.fill = Color::from_gray(level);
                }
            }
            "rg" | "k" | "sc" | "scn" => {
                if let Some(color) = color_from_components(&op.numbers()) {
                    self.state.fill = color;
                }
            }
            "Do" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    let ctm = &self.state.ctm;
                    let corners = [
                        ctm.apply(0.0, 0.0),
                        ctm.apply(1.0, 0.0),
                        ctm.apply(0.0, 1.0),
                        ctm.apply(1.0, 1.0),
                    ];
                    let xs = corners.iter().map(|p| p.0);
                    let ys = corners.iter().map(|p| p.1);
                    let bbox = BBox::new(
                        xs.clone().fold(f32::INFINITY, f32::min),
                        ys.clone().fold(f32::INFINITY, f32::min),
                        xs.fold(f32::NEG_INFINITY, f32::max),
                        ys.fold(f32::NEG_INFINITY, f32::max),
                    );
                    self.marks.images.push(ImagePlacement {
                        name: name.clone(),
                        bbox,
                    });
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
    }

    /// Show a string: emit one glyph per non-whitespace character and
    /// advance the text matrix past each.
    fn show(&mut self, bytes: &[u8]) {
        let font_key = self.state.font.clone().unwrap_or_default();
        let metrics = self.fonts.get(&font_key);
        let text = (self.decode)(&font_key, bytes);
        let chars: Vec<char> = text.chars().collect();

        // Single-byte fonts map one code per character when decoding is 1:1.
        let codes = match metrics {
            Some(m) if !m.composite && chars.len() == bytes.len() => Some(bytes),
            _ => None,
        };
        let base_font = metrics
            .map(|m| m.base_font.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(&font_key).to_string());

        let size = self.state.font_size;
        let h = self.state.horizontal_scale;

        for (i, ch) in chars.iter().enumerate() {
            let declared = codes
                .zip(metrics)
                .and_then(|(codes, m)| m.width(codes[i] as u32));
            let w0 = declared.unwrap_or_else(|| fallback_width(*ch)) / 1000.0;

            let render = Matrix::new(size * h, 0.0, 0.0, size, 0.0, self.state.rise)
                .then(&self.text_matrix)
                .then(&self.state.ctm);

            if !ch.is_whitespace() {
                let (x, y) = render.apply(0.0, 0.0);
                let (x_end, _) = render.apply(w0, 0.0);
                let effective = render.vertical_scale();
                self.marks.glyphs.push(Glyph {
                    text: ch.to_string(),
                    x0: x.min(x_end),
                    x1: x.max(x_end),
                    y0: y - effective * DESCENT,
                    y1: y + effective * ASCENT,
                    size: effective,
                    font: base_font.clone(),
                    color: self.state.fill,
                });
            }

            let spacing = if *ch == ' ' {
                self.state.char_spacing + self.state.word_spacing
            } else {
                self.state.char_spacing
            };
            self.advance((w0 * size + spacing) * h);
        }
    }
}

/// Width in 1/1000 em for characters without declared metrics.
pub(crate) fn fallback_width(c: char) -> f32 {
    if super::lines::is_spaceless_script_char(c) || is_hangul(c) {
        1000.0
    } else {
        500.0
    }
}

fn is_hangul(c: char) -> bool {
    matches!(c as u32, 0xAC00..=0xD7AF | 0x1100..=0x11FF | 0x3130..=0x318F)
}

/// Fill color from gray, RGB or CMYK operands.
fn color_from_components(values: &[f32]) -> Option<Color> {
    match values {
        [g] => Some(Color::from_gray(*g)),
        [r, g, b] => Some(Color::from_unit_rgb(*r, *g, *b)),
        [c, m, y, k] => Some(Color::from_cmyk(*c, *m, *y, *k)),
        _ => None,
    }
}
