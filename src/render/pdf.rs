//! Paginated PDF output built with `printpdf`.
//!
//! Blocks flow top to bottom inside each source page's margins. A block that
//! does not fit continues on a fresh page of the same size, and every source
//! page starts a new output page.

use std::fs;
use std::mem;

use printpdf::{
    BuiltinFont, Color as PdfColor, FontId, Line, LinePoint, Mm, Op, PaintMode, ParsedFont,
    PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Polygon, PolygonRing, Pt, RawImage,
    RawImageData, RawImageFormat, Rgb, TextItem, WindingOrder, XObjectId, XObjectTransform,
};

use super::images::{ImageStager, StagedImage};
use super::WriteOptions;
use crate::error::{Error, Result};
use crate::model::{Color, Content, Document, Grid, Margins, Page, TextStyle};
use crate::source::{fallback_width, is_spaceless_script_char};

const MM_PER_PT: f32 = 25.4 / 72.0;

/// US letter, used for empty documents and pages without a size.
const LETTER: (f32, f32) = (612.0, 792.0);

const HEADER_FONT_SIZE: f32 = 14.0;
const HEADER_BOTTOM_PADDING: f32 = 12.0;
const BODY_FONT_SIZE: f32 = 10.0;
const CELL_PADDING: f32 = 3.0;
const GRID_LINE_WIDTH: f32 = 1.0;
const HEADER_FILL: Color = Color::rgb(128, 128, 128);
const HEADER_TEXT: Color = Color::rgb(245, 245, 245);

/// Helvetica's space width in em.
const SPACE_WIDTH_EM: f32 = 0.278;

/// Render a document to PDF bytes.
pub fn to_pdf(doc: &Document, options: &WriteOptions) -> Result<Vec<u8>> {
    PdfWriter::new(options.clone()).render(doc)
}

/// Writes translated blocks as a paginated PDF.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    options: WriteOptions,
}

impl PdfWriter {
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Render the translated blocks of `doc`.
    ///
    /// Untranslated blocks are omitted. Staged image files are removed
    /// before this returns, whether or not rendering succeeds.
    pub fn render(&self, doc: &Document) -> Result<Vec<u8>> {
        let title = self.options.title.clone().unwrap_or_else(|| {
            doc.source()
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Translated document".to_string())
        });

        let mut pdf = PdfDocument::new(&title);
        let typeface = self.load_typeface(&mut pdf)?;
        if matches!(typeface, Typeface::Builtin) && needs_substitution_font(doc) {
            log::warn!("Translated text contains characters Helvetica cannot show; set a font path");
        }

        let stager = ImageStager::new()?;
        let mut flow = Flow::new(&typeface);

        for (page_idx, page) in doc.pages.iter().enumerate() {
            flow.start_page(page);
            for (block_idx, content) in page.contents.iter().enumerate() {
                match content {
                    Content::Text(text) => {
                        if let Some(translated) = text.translated() {
                            flow.paragraph(translated, &text.style);
                        }
                    }
                    Content::Table(table) => {
                        if let Some(grid) = table.translated() {
                            flow.table(grid, &table.col_widths, table.space_before);
                        }
                    }
                    Content::Image(image) => {
                        if let Some(staged) = stager.stage(page_idx, block_idx, image)? {
                            let (px_width, px_height) = staged.pixels.dimensions();
                            let id = pdf.add_image(&raw_image(staged));
                            flow.image(id, (px_width, px_height), image.width, image.height);
                        }
                    }
                }
            }
        }

        let pages = flow.finish();
        log::debug!("Laid out {} PDF pages from {} source pages", pages.len(), doc.page_count());
        pdf.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = pdf.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            log::debug!("{} warnings while saving PDF", warnings.len());
        }

        stager.close()?;
        Ok(bytes)
    }

    fn load_typeface(&self, pdf: &mut PdfDocument) -> Result<Typeface> {
        let Some(path) = &self.options.font_path else {
            return Ok(Typeface::Builtin);
        };

        let bytes = fs::read(path)?;
        let mut warnings = Vec::new();
        let font = ParsedFont::from_bytes(&bytes, 0, &mut warnings)
            .ok_or_else(|| Error::Render(format!("cannot parse font {}", path.display())))?;
        log::debug!("Embedding substitution font {}", path.display());
        Ok(Typeface::Embedded(pdf.add_font(&font)))
    }
}

fn raw_image(staged: StagedImage) -> RawImage {
    let (width, height) = staged.pixels.dimensions();
    RawImage {
        pixels: RawImageData::U8(staged.pixels.into_raw()),
        width: width as usize,
        height: height as usize,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    }
}

fn needs_substitution_font(doc: &Document) -> bool {
    let beyond_latin1 = |s: &str| s.chars().any(|c| c as u32 > 0xFF);
    doc.contents().any(|content| match content {
        Content::Text(text) => text.translated().map(beyond_latin1).unwrap_or(false),
        Content::Table(table) => table
            .translated()
            .map(|grid| grid.rows().iter().flatten().any(|cell| beyond_latin1(cell)))
            .unwrap_or(false),
        Content::Image(_) => false,
    })
}

/// Font used for all text.
enum Typeface {
    Builtin,
    Embedded(FontId),
}

impl Typeface {
    fn set_size(&self, size: f32, bold: bool) -> Op {
        match self {
            Typeface::Builtin => Op::SetFontSizeBuiltinFont {
                size: Pt(size),
                font: builtin(bold),
            },
            Typeface::Embedded(font) => Op::SetFontSize {
                size: Pt(size),
                font: font.clone(),
            },
        }
    }

    fn write(&self, text: &str, bold: bool) -> Op {
        let items = vec![TextItem::Text(text.to_string())];
        match self {
            Typeface::Builtin => Op::WriteTextBuiltinFont {
                items,
                font: builtin(bold),
            },
            Typeface::Embedded(font) => Op::WriteText {
                items,
                font: font.clone(),
            },
        }
    }
}

fn builtin(bold: bool) -> BuiltinFont {
    if bold {
        BuiltinFont::HelveticaBold
    } else {
        BuiltinFont::Helvetica
    }
}

/// Flow layout state: finished pages plus the page being filled.
struct Flow<'a> {
    typeface: &'a Typeface,
    pages: Vec<PdfPage>,
    ops: Vec<Op>,
    width: f32,
    height: f32,
    margins: Margins,
    /// y of the next block's top edge, in PDF user space
    cursor: f32,
    started: bool,
}

impl<'a> Flow<'a> {
    fn new(typeface: &'a Typeface) -> Self {
        let (width, height) = LETTER;
        Self {
            typeface,
            pages: Vec::new(),
            ops: Vec::new(),
            width,
            height,
            margins: Margins {
                left: 72.0,
                right: width - 72.0,
                top: 72.0,
                bottom: 72.0,
            },
            cursor: height - 72.0,
            started: false,
        }
    }

    /// Begin the output page for a source page.
    fn start_page(&mut self, page: &Page) {
        if self.started {
            self.finish_page();
        }
        self.started = true;
        if page.width > 0.0 && page.height > 0.0 {
            self.width = page.width;
            self.height = page.height;
        } else {
            (self.width, self.height) = LETTER;
        }
        self.margins = page.margins;
        self.cursor = self.top();
    }

    fn finish_page(&mut self) {
        let ops = mem::take(&mut self.ops);
        self.pages.push(PdfPage::new(
            Mm(self.width * MM_PER_PT),
            Mm(self.height * MM_PER_PT),
            ops,
        ));
    }

    fn finish(mut self) -> Vec<PdfPage> {
        // A PDF needs at least one page.
        self.finish_page();
        self.pages
    }

    fn top(&self) -> f32 {
        self.height - self.margins.top
    }

    /// Continue on a fresh page if `needed` points do not fit.
    ///
    /// Never breaks at the top of a page, so oversized blocks overflow
    /// instead of looping.
    fn ensure(&mut self, needed: f32) {
        let at_top = self.cursor >= self.top() - f32::EPSILON;
        if !at_top && self.cursor - needed < self.margins.bottom {
            self.finish_page();
            self.cursor = self.top();
        }
    }

    /// Vertical gap before a block, dropped at the top of a page.
    fn space_before(&mut self, gap: f32) {
        if self.cursor < self.top() {
            self.cursor -= gap;
        }
    }

    fn paragraph(&mut self, text: &str, style: &TextStyle) {
        let size = style.font_size.max(1.0);
        let leading = if style.leading > 0.0 { style.leading } else { size * 1.2 };
        let width = self.margins.column_width().max(size);
        let first_width = (width - style.first_line_indent).max(size);

        self.space_before(style.space_before);
        for (idx, line) in wrap_text(text, size, first_width, width).iter().enumerate() {
            self.ensure(leading);
            let indent = if idx == 0 { style.first_line_indent } else { 0.0 };
            let baseline = self.cursor - size;
            self.text(line, self.margins.left + indent, baseline, size, style.bold, style.color);
            self.cursor -= leading;
        }
    }

    fn table(&mut self, grid: &Grid, col_widths: &[f32], space_before: f32) {
        let columns = grid.column_count();
        if columns == 0 {
            return;
        }
        let even = self.margins.column_width() / columns as f32;
        let widths: Vec<f32> = (0..columns)
            .map(|i| col_widths.get(i).copied().filter(|w| *w > 0.0).unwrap_or(even))
            .collect();

        self.space_before(space_before);
        for (row_idx, row) in grid.rows().iter().enumerate() {
            let (size, fill, text_color, bottom_padding) = if row_idx == 0 {
                (HEADER_FONT_SIZE, HEADER_FILL, HEADER_TEXT, HEADER_BOTTOM_PADDING)
            } else {
                (BODY_FONT_SIZE, Color::WHITE, Color::BLACK, CELL_PADDING)
            };
            let height = CELL_PADDING + size * 1.2 + bottom_padding;
            self.ensure(height);

            let bottom = self.cursor - height;
            let baseline = bottom + bottom_padding + size * 0.2;
            let mut x = self.margins.left;
            for (cell, width) in row.iter().zip(&widths) {
                self.fill_rect(x, bottom, *width, height, fill);
                let offset = ((width - estimate_width(cell, size)) / 2.0).max(0.0);
                self.text(cell, x + offset, baseline, size, false, text_color);
                self.stroke_rect(x, bottom, *width, height);
                x += width;
            }
            self.cursor = bottom;
        }
    }

    fn image(&mut self, id: XObjectId, pixels: (u32, u32), width: f32, height: f32) {
        let (px_width, px_height) = (pixels.0.max(1) as f32, pixels.1.max(1) as f32);
        let width = if width > 0.0 { width } else { px_width };
        let height = if height > 0.0 { height } else { px_height };

        self.ensure(height);
        let bottom = self.cursor - height;
        // At 72 dpi one pixel spans one point.
        self.ops.push(Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(self.margins.left)),
                translate_y: Some(Pt(bottom)),
                rotate: None,
                scale_x: Some(width / px_width),
                scale_y: Some(height / px_height),
                dpi: Some(72.0),
            },
        });
        self.cursor = bottom;
    }

    fn text(&mut self, text: &str, x: f32, baseline: f32, size: f32, bold: bool, color: Color) {
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetFillColor {
            col: pdf_color(color),
        });
        self.ops.push(Op::SetTextCursor {
            pos: point(x, baseline),
        });
        self.ops.push(self.typeface.set_size(size, bold));
        self.ops.push(self.typeface.write(text, bold));
        self.ops.push(Op::EndTextSection);
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.ops.push(Op::SetFillColor {
            col: pdf_color(color),
        });
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: rect_points(x, y, width, height),
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(Op::SetOutlineColor {
            col: pdf_color(Color::BLACK),
        });
        self.ops.push(Op::SetOutlineThickness {
            pt: Pt(GRID_LINE_WIDTH),
        });
        self.ops.push(Op::DrawLine {
            line: Line {
                points: rect_points(x, y, width, height),
                is_closed: true,
            },
        });
    }
}

fn point(x: f32, y: f32) -> Point {
    Point { x: Pt(x), y: Pt(y) }
}

fn rect_points(x: f32, y: f32, width: f32, height: f32) -> Vec<LinePoint> {
    [(x, y), (x + width, y), (x + width, y + height), (x, y + height)]
        .into_iter()
        .map(|(x, y)| LinePoint {
            p: point(x, y),
            bezier: false,
        })
        .collect()
}

fn pdf_color(color: Color) -> PdfColor {
    let (r, g, b) = color.to_unit_rgb();
    PdfColor::Rgb(Rgb::new(r, g, b, None))
}

/// Approximate advance width of `text` at `size` points.
fn estimate_width(text: &str, size: f32) -> f32 {
    text.chars()
        .map(|c| {
            if c == ' ' {
                SPACE_WIDTH_EM
            } else {
                fallback_width(c) / 1000.0
            }
        })
        .sum::<f32>()
        * size
}

/// Greedy line breaking.
///
/// Breaks at spaces, and between characters of scripts written without
/// word spaces. The first line may be narrower to leave room for an indent.
/// A word wider than the column is kept whole on its own line.
fn wrap_text(text: &str, size: f32, first_width: f32, width: f32) -> Vec<String> {
    let space = SPACE_WIDTH_EM * size;
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0.0;
    let mut limit = first_width;

    for (token, spaced) in break_tokens(text) {
        let token_width = estimate_width(&token, size);
        if !line.is_empty() {
            let gap = if spaced { space } else { 0.0 };
            if line_width + gap + token_width > limit {
                lines.push(mem::take(&mut line));
                line_width = 0.0;
                limit = width;
            } else if spaced {
                line.push(' ');
                line_width += gap;
            }
        }
        line.push_str(&token);
        line_width += token_width;
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Unbreakable pieces of `text`, each flagged with whether a space precedes it.
fn break_tokens(text: &str) -> Vec<(String, bool)> {
    let mut tokens = Vec::new();
    for (word_idx, word) in text.split_whitespace().enumerate() {
        let mut spaced = word_idx > 0;
        let mut run = String::new();
        for c in word.chars() {
            if is_spaceless_script_char(c) {
                if !run.is_empty() {
                    tokens.push((mem::take(&mut run), spaced));
                    spaced = false;
                }
                tokens.push((c.to_string(), spaced));
                spaced = false;
            } else {
                run.push(c);
            }
        }
        if !run.is_empty() {
            tokens.push((run, spaced));
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageContent, TableContent, TextContent};
    use std::io::Cursor;

    fn margins() -> Margins {
        Margins {
            left: 72.0,
            right: 540.0,
            top: 72.0,
            bottom: 72.0,
        }
    }

    fn translated_text(text: &str, anchor: f32) -> TextContent {
        let mut content = TextContent::new(text, anchor, TextStyle::default());
        content.set_translation(text.to_string(), true);
        content
    }

    fn page_count(bytes: &[u8]) -> usize {
        lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn test_wrap_latin() {
        let lines = wrap_text("aaaa bbbb cccc", 10.0, 45.0, 45.0);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn test_wrap_first_line_indent() {
        let lines = wrap_text("aaaa bbbb cccc", 10.0, 25.0, 45.0);
        assert_eq!(lines, vec!["aaaa", "bbbb cccc"]);
    }

    #[test]
    fn test_wrap_cjk_between_characters() {
        let lines = wrap_text("你好世界", 10.0, 25.0, 25.0);
        assert_eq!(lines, vec!["你好", "世界"]);
    }

    #[test]
    fn test_break_tokens_mixed() {
        let tokens = break_tokens("PDF 翻译器 ok");
        assert_eq!(
            tokens,
            vec![
                ("PDF".to_string(), false),
                ("翻".to_string(), true),
                ("译".to_string(), false),
                ("器".to_string(), false),
                ("ok".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_estimate_width() {
        assert_eq!(estimate_width("ab", 10.0), 10.0);
        assert_eq!(estimate_width("字", 12.0), 12.0);
    }

    #[test]
    fn test_one_output_page_per_source_page() {
        let mut doc = Document::new("book.pdf");
        for number in 1..=2 {
            let mut page = Page::new(number, 612.0, 792.0, margins());
            page.add_content(translated_text("Short paragraph.", 700.0));
            doc.add_page(page);
        }

        let bytes = to_pdf(&doc, &WriteOptions::new()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(page_count(&bytes), 2);
    }

    #[test]
    fn test_long_text_continues_on_new_page() {
        let long = "word ".repeat(3000);
        let mut page = Page::new(1, 612.0, 792.0, margins());
        page.add_content(translated_text(long.trim(), 700.0));
        let mut doc = Document::new("book.pdf");
        doc.add_page(page);

        let bytes = to_pdf(&doc, &WriteOptions::new()).unwrap();
        assert!(page_count(&bytes) > 1);
    }

    #[test]
    fn test_table_and_image() {
        let grid = Grid::from_rows(vec![vec!["Name", "Qty"], vec!["Apple", "3"]]).unwrap();
        let mut table = TableContent::new(grid.clone(), 600.0, vec![234.0, 234.0]);
        table.set_translation(grid, true);

        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 255]));
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).unwrap();

        let mut page = Page::new(1, 612.0, 792.0, margins());
        page.add_content(table);
        page.add_content(ImageContent::new(png.into_inner(), 64.0, 64.0, 400.0));
        page.add_content(ImageContent::new(vec![9, 9, 9], 64.0, 64.0, 300.0));
        let mut doc = Document::new("book.pdf");
        doc.add_page(page);

        let bytes = to_pdf(&doc, &WriteOptions::new()).unwrap();
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn test_untranslated_document_still_renders() {
        let mut page = Page::new(1, 612.0, 792.0, margins());
        page.add_content(TextContent::new("Never translated.", 700.0, TextStyle::default()));
        let mut doc = Document::new("book.pdf");
        doc.add_page(page);

        let bytes = to_pdf(&doc, &WriteOptions::new()).unwrap();
        assert_eq!(page_count(&bytes), 1);

        let empty = to_pdf(&Document::new("empty.pdf"), &WriteOptions::new()).unwrap();
        assert_eq!(page_count(&empty), 1);
    }

    #[test]
    fn test_missing_font_is_error() {
        let options = WriteOptions::new().with_font("/nonexistent/font.ttf");
        let result = to_pdf(&Document::new("x.pdf"), &options);
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
