//! Layout extraction: raw page primitives to ordered content blocks.
//!
//! The extractor infers margins from line geometry, groups lines into
//! paragraphs, splices detected tables into the flow at the line that
//! starts them, and orders every block top to bottom according to the
//! source's coordinate origin.

pub mod frequency;
mod paragraph;

use std::collections::HashSet;

use rayon::prelude::*;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::model::{Content, Document, Grid, ImageContent, Margins, Page, TableContent};
use crate::source::{PageSource, RawPage, TextLine};

pub use paragraph::{build_paragraph, is_paragraph_tail};

/// Left margin used when a page has no glyphs.
const FALLBACK_LEFT: f32 = 20.0;
/// Inset from the page edge used for the right margin when a page has no glyphs.
const FALLBACK_RIGHT_INSET: f32 = 20.0;
/// Top and bottom margin used when a page has no lines.
const FALLBACK_TOP: f32 = 30.0;

/// Error handling mode for pages that fail to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any error
    #[default]
    Strict,
    /// Emit an empty page and continue
    Lenient,
}

/// Options for layout extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Number of leading pages to extract (`None` = all)
    pub pages: Option<usize>,

    /// Whether to lay out pages in parallel
    pub parallel: bool,

    /// A line narrower than this fraction of the page width ends its paragraph
    pub tail_width_ratio: f32,

    /// Error handling mode
    pub error_mode: ErrorMode,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract only the first `count` pages.
    pub fn with_pages(mut self, count: usize) -> Self {
        self.pages = Some(count);
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the paragraph-tail width ratio.
    pub fn with_tail_width_ratio(mut self, ratio: f32) -> Self {
        self.tail_width_ratio = ratio;
        self
    }

    /// Enable lenient mode (pages that fail to load become empty pages).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            pages: None,
            parallel: true,
            tail_width_ratio: 0.8,
            error_mode: ErrorMode::Strict,
        }
    }
}

/// Converts raw page primitives into a [`Document`].
#[derive(Debug, Clone, Default)]
pub struct LayoutExtractor {
    options: ExtractOptions,
}

impl LayoutExtractor {
    /// Create an extractor with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with custom options.
    pub fn with_options(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Extract the requested pages of a source.
    ///
    /// Fails with [`Error::OutOfRange`] when more pages are requested than
    /// the source has; no partial document is returned.
    pub fn extract(&self, source: &dyn PageSource) -> Result<Document> {
        let actual = source.page_count();
        let count = match self.options.pages {
            Some(requested) if requested > actual => {
                return Err(Error::OutOfRange { actual, requested });
            }
            Some(requested) => requested,
            None => actual,
        };

        log::info!(
            "Extracting {} of {} pages from {}",
            count,
            actual,
            source.path().display()
        );

        let mut raw_pages = Vec::with_capacity(count);
        for index in 0..count {
            match source.raw_page(index) {
                Ok(raw) => raw_pages.push(Some(raw)),
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("Failed to read page {}: {}", index + 1, e);
                    raw_pages.push(None);
                }
                Err(e) => return Err(e),
            }
        }

        let layout = |(index, raw): (usize, &Option<RawPage>)| -> Result<Page> {
            let number = index as u32 + 1;
            match raw {
                Some(raw) => self.extract_page(number, raw),
                None => Ok(empty_page(number)),
            }
        };

        let pages: Vec<Page> = if self.options.parallel {
            raw_pages.par_iter().enumerate().map(layout).collect::<Result<_>>()?
        } else {
            raw_pages.iter().enumerate().map(layout).collect::<Result<_>>()?
        };

        let mut document = Document::new(source.path());
        for page in pages {
            document.add_page(page);
        }
        Ok(document)
    }

    /// Lay out one page. Pure function of its inputs.
    ///
    /// Fails with [`Error::RaggedTable`] when a table's rows differ in length.
    pub fn extract_page(&self, number: u32, raw: &RawPage) -> Result<Page> {
        let margins = infer_margins(raw);
        let mut page = Page::new(number, raw.width, raw.height, margins);

        // Every table is checked up front, including ones no line matches.
        let grids = raw
            .tables
            .iter()
            .map(|table| Grid::new(table.rows.clone()))
            .collect::<Result<Vec<_>>>()?;

        let table_rows: HashSet<String> = raw
            .tables
            .iter()
            .flat_map(|table| table.rows.iter())
            .map(|row| normalize(&row.join(" ")))
            .collect();

        let mut contents: Vec<Content> = Vec::new();
        let mut pending_tables = raw.tables.iter().zip(grids).peekable();
        let mut buffer: Vec<&TextLine> = Vec::new();
        let last = raw.lines.len().saturating_sub(1);

        for (idx, line) in raw.lines.iter().enumerate() {
            let text = normalize(&line.text);

            if !table_rows.contains(&text) {
                buffer.push(line);
            }

            if is_paragraph_tail(line, raw.width, self.options.tail_width_ratio, idx == last) {
                flush(&mut buffer, &mut contents, margins.left);
            }

            let starts_table = pending_tables
                .peek()
                .and_then(|(table, _)| table.first_row_text())
                .map(|first_row| normalize(&first_row) == text)
                .unwrap_or(false);

            if starts_table {
                flush(&mut buffer, &mut contents, margins.left);
                if let Some((table, grid)) = pending_tables.next() {
                    let anchor = line.chars.first().map(|g| g.y0).unwrap_or(table.anchor);
                    let content = table_content(grid, anchor, &margins);
                    log::debug!(
                        "Page {}: table with {} rows at y={}",
                        number,
                        content.original.row_count(),
                        anchor
                    );
                    contents.push(Content::Table(content));
                }
            }
        }
        flush(&mut buffer, &mut contents, margins.left);

        for image in &raw.images {
            let anchor = raw.origin.top_edge(&image.bbox);
            contents.push(Content::Image(
                ImageContent::new(image.bytes.clone(), image.width, image.height, anchor)
                    .with_format(image.format),
            ));
        }

        // Stable: blocks sharing an anchor keep emission order.
        contents.sort_by(|a, b| raw.origin.reading_order(a.anchor(), b.anchor()));

        page.contents = contents;
        Ok(page)
    }
}

/// Flush the paragraph buffer into a text block.
fn flush(buffer: &mut Vec<&TextLine>, contents: &mut Vec<Content>, left_margin: f32) {
    if let Some(text) = build_paragraph(buffer, left_margin) {
        contents.push(Content::Text(text));
    }
    buffer.clear();
}

fn table_content(grid: Grid, anchor: f32, margins: &Margins) -> TableContent {
    let columns = grid.column_count().max(1);
    let width = margins.column_width() / columns as f32;
    TableContent::new(grid, anchor, vec![width; columns])
}

/// Infer page margins from line geometry.
fn infer_margins(raw: &RawPage) -> Margins {
    let left = frequency::most_common_f32(
        raw.lines
            .iter()
            .filter_map(|line| line.chars.first())
            .map(|g| g.x0),
    )
    .unwrap_or(FALLBACK_LEFT);

    let right = raw
        .lines
        .iter()
        .filter_map(|line| line.chars.last())
        .map(|g| g.x1)
        .reduce(f32::max)
        .unwrap_or(raw.width - FALLBACK_RIGHT_INSET);

    let top = raw
        .lines
        .first()
        .map(|line| raw.origin.distance_from_top(&line.bbox, raw.height))
        .filter(|top| *top > 0.0)
        .unwrap_or(FALLBACK_TOP);

    Margins {
        left,
        right,
        top,
        bottom: top,
    }
}

fn empty_page(number: u32) -> Page {
    let (width, height) = (612.0, 792.0);
    Page::new(
        number,
        width,
        height,
        Margins {
            left: FALLBACK_LEFT,
            right: width - FALLBACK_RIGHT_INSET,
            top: FALLBACK_TOP,
            bottom: FALLBACK_TOP,
        },
    )
}

/// NFKC-normalize, collapse whitespace runs and trim.
pub fn normalize(text: &str) -> String {
    text.nfkc()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Color;
    use crate::source::{BBox, CoordinateOrigin, Glyph, RawImage, RawTable};

    fn line(text: &str, x0: f32, x1: f32, y: f32) -> TextLine {
        let glyph = |x: f32| Glyph {
            text: "x".to_string(),
            x0: x,
            x1: x + 6.0,
            y0: y,
            y1: y + 12.0,
            size: 12.0,
            font: "Helvetica".to_string(),
            color: Color::BLACK,
        };
        TextLine {
            text: text.to_string(),
            bbox: BBox::new(x0, y, x1, y + 12.0),
            chars: vec![glyph(x0), glyph(x1 - 6.0)],
        }
    }

    #[test]
    fn test_margins() {
        let mut raw = RawPage::new(612.0, 792.0);
        raw.lines = vec![
            line("a", 90.0, 560.0, 700.0),
            line("b", 72.0, 560.0, 685.0),
            line("c", 72.0, 580.0, 670.0),
        ];
        let margins = infer_margins(&raw);
        assert_eq!(margins.left, 72.0);
        assert_eq!(margins.right, 580.0);
        assert_eq!(margins.top, 80.0);
        assert_eq!(margins.bottom, 80.0);
    }

    #[test]
    fn test_margins_fallback() {
        let raw = RawPage::new(612.0, 792.0);
        let margins = infer_margins(&raw);
        assert_eq!(margins.left, 20.0);
        assert_eq!(margins.right, 592.0);
        assert_eq!(margins.top, 30.0);
    }

    #[test]
    fn test_three_line_paragraph() {
        let mut raw = RawPage::new(612.0, 792.0);
        raw.lines = vec![
            line("The quick brown fox", 72.0, 560.0, 700.0),
            line("jumps over the lazy", 72.0, 560.0, 685.0),
            line("dog.", 72.0, 200.0, 670.0),
        ];

        let page = LayoutExtractor::new().extract_page(1, &raw).unwrap();
        assert_eq!(page.contents.len(), 1);
        match &page.contents[0] {
            Content::Text(text) => {
                assert_eq!(text.original, "The quick brown fox jumps over the lazy dog.");
                assert_eq!(text.anchor, 700.0);
            }
            other => panic!("expected text, got {}", other.kind()),
        }
    }

    #[test]
    fn test_table_splits_paragraph() {
        let mut raw = RawPage::new(612.0, 792.0);
        raw.lines = vec![
            line("Intro that runs long", 72.0, 560.0, 700.0),
            line("Name Qty", 72.0, 300.0, 680.0),
            line("Apple 3", 72.0, 300.0, 665.0),
            line("After.", 72.0, 200.0, 640.0),
        ];
        raw.tables = vec![RawTable {
            rows: vec![
                vec!["Name".into(), "Qty".into()],
                vec!["Apple".into(), "3".into()],
            ],
            anchor: 680.0,
        }];

        let page = LayoutExtractor::new().extract_page(1, &raw).unwrap();
        let kinds: Vec<_> = page.contents.iter().map(Content::kind).collect();
        assert_eq!(kinds, vec!["text", "table", "text"]);

        match &page.contents[1] {
            Content::Table(table) => {
                assert_eq!(table.anchor, 680.0);
                assert_eq!(table.original.row_count(), 2);
                assert_eq!(table.col_widths, vec![244.0, 244.0]);
            }
            other => panic!("expected table, got {}", other.kind()),
        }
        match &page.contents[2] {
            Content::Text(text) => assert_eq!(text.original, "After."),
            other => panic!("expected text, got {}", other.kind()),
        }
    }

    #[test]
    fn test_images_sorted_by_top_edge() {
        let mut raw = RawPage::new(612.0, 792.0);
        raw.lines = vec![
            line("Above.", 72.0, 200.0, 700.0),
            line("Below.", 72.0, 200.0, 300.0),
        ];
        raw.images = vec![RawImage {
            bbox: BBox::new(72.0, 400.0, 272.0, 600.0),
            bytes: vec![1, 2, 3],
            width: 200.0,
            height: 200.0,
            format: None,
        }];

        let page = LayoutExtractor::new().extract_page(1, &raw).unwrap();
        let kinds: Vec<_> = page.contents.iter().map(Content::kind).collect();
        assert_eq!(kinds, vec!["text", "image", "text"]);
        assert_eq!(page.contents[1].anchor(), 600.0);
        assert!(page.contents[1].status());
    }

    #[test]
    fn test_top_left_origin_sorts_ascending() {
        let mut raw = RawPage::new(612.0, 792.0);
        raw.origin = CoordinateOrigin::TopLeft;
        raw.lines = vec![
            line("First.", 72.0, 200.0, 80.0),
            line("Second.", 72.0, 200.0, 120.0),
        ];

        let page = LayoutExtractor::new().extract_page(1, &raw).unwrap();
        let anchors: Vec<_> = page.contents.iter().map(Content::anchor).collect();
        assert_eq!(anchors, vec![80.0, 120.0]);
        assert_eq!(page.margins.top, 80.0);
    }

    #[test]
    fn test_ragged_table_fails_page() {
        let mut raw = RawPage::new(612.0, 792.0);
        raw.lines = vec![
            line("Intro.", 72.0, 200.0, 700.0),
            line("A B", 72.0, 200.0, 680.0),
            line("C", 72.0, 200.0, 665.0),
            line("End.", 72.0, 200.0, 640.0),
        ];
        raw.tables = vec![RawTable {
            rows: vec![vec!["A".into(), "B".into()], vec!["C".into()]],
            anchor: 680.0,
        }];

        let result = LayoutExtractor::new().extract_page(1, &raw);
        assert!(matches!(
            result,
            Err(Error::RaggedTable { row: 1, expected: 2, found: 1 })
        ));

        let source = crate::source::MemorySource::new("ragged.pdf", vec![raw]);
        assert!(matches!(
            LayoutExtractor::new().extract(&source),
            Err(Error::RaggedTable { .. })
        ));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  a \t b\n"), "a b");
        assert_eq!(normalize("ﬁne"), "fine");
        assert_eq!(normalize("Ｎａｍｅ"), "Name");
    }
}
