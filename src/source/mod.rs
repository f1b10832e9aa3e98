//! Positional primitives supplied by a page source.
//!
//! A [`PageSource`] yields one [`RawPage`] per page: text lines with
//! per-glyph geometry, table cell grids, and embedded images. The layout
//! extractor consumes these and never touches the source format directly.
//!
//! Two sources ship with the crate: [`PdfSource`], which interprets PDF
//! content streams with `lopdf`, and [`MemorySource`], which holds pages
//! supplied by a host (for example as JSON from another parser).

mod backend;
mod interpreter;
mod lines;
mod pdf;
mod table_detector;

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Color, ImageFormat};

pub use backend::{decode_text_simple, FontMetrics, LopdfBackend, PdfBackend, PageId};
pub(crate) use interpreter::fallback_width;
pub(crate) use lines::is_spaceless_script_char;
pub use lines::{group_into_lines, line_from_glyphs};
pub use pdf::PdfSource;
pub use table_detector::{TableDetector, TableDetectorConfig};

/// Direction of the y axis used by a source's coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateOrigin {
    /// PDF user space: y grows upward from the bottom edge.
    #[default]
    BottomLeft,
    /// Screen space: y grows downward from the top edge.
    TopLeft,
}

impl CoordinateOrigin {
    /// Compare two anchors so that the one nearer the page top sorts first.
    pub fn reading_order(self, a: f32, b: f32) -> Ordering {
        match self {
            CoordinateOrigin::BottomLeft => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
            CoordinateOrigin::TopLeft => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        }
    }

    /// The y coordinate of a box's visually upper edge.
    pub fn top_edge(self, bbox: &BBox) -> f32 {
        match self {
            CoordinateOrigin::BottomLeft => bbox.y1,
            CoordinateOrigin::TopLeft => bbox.y0,
        }
    }

    /// Distance from the page's top edge to a box's upper edge.
    pub fn distance_from_top(self, bbox: &BBox, page_height: f32) -> f32 {
        match self {
            CoordinateOrigin::BottomLeft => page_height - bbox.y1,
            CoordinateOrigin::TopLeft => bbox.y0,
        }
    }
}

/// Axis-aligned bounding box with `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// One rendered character with its geometry and style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    /// The character (or ligature) text
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub y0: f32,
    pub y1: f32,
    /// Effective font size in points
    pub size: f32,
    /// Font name, e.g. "Helvetica-Bold"
    pub font: String,
    /// Fill color
    #[serde(default)]
    pub color: Color,
}

impl Glyph {
    /// Glyph box height.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// A line of text with its glyphs in left-to-right order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub bbox: BBox,
    pub chars: Vec<Glyph>,
}

/// A table recovered by the source, as a grid of cell text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
    /// Page-space y of the table's first row
    pub anchor: f32,
}

impl RawTable {
    /// Space-joined text of the first row.
    pub fn first_row_text(&self) -> Option<String> {
        self.rows.first().map(|row| row.join(" "))
    }
}

/// An embedded raster image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawImage {
    /// Placement on the page
    pub bbox: BBox,
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// Display width in points
    pub width: f32,
    /// Display height in points
    pub height: f32,
    /// Declared encoding, if the source knows it
    #[serde(default)]
    pub format: Option<ImageFormat>,
}

/// Everything a source knows about one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub origin: CoordinateOrigin,
    /// Lines in reading order
    #[serde(default)]
    pub lines: Vec<TextLine>,
    /// Tables in reading order
    #[serde(default)]
    pub tables: Vec<RawTable>,
    #[serde(default)]
    pub images: Vec<RawImage>,
}

impl RawPage {
    /// Create an empty page with a bottom-left origin.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            origin: CoordinateOrigin::BottomLeft,
            lines: Vec::new(),
            tables: Vec::new(),
            images: Vec::new(),
        }
    }
}

/// A paginated input that yields positional primitives per page.
pub trait PageSource {
    /// Path of the underlying document.
    fn path(&self) -> &Path;

    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Primitives for the page at `index` (0-based).
    fn raw_page(&self, index: usize) -> Result<RawPage>;
}

/// Pages held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    path: PathBuf,
    pages: Vec<RawPage>,
}

impl MemorySource {
    /// Create a source over already-built pages.
    pub fn new(path: impl Into<PathBuf>, pages: Vec<RawPage>) -> Self {
        Self {
            path: path.into(),
            pages,
        }
    }

    /// Parse a JSON array of pages.
    pub fn from_json(path: impl Into<PathBuf>, json: &str) -> Result<Self> {
        let pages: Vec<RawPage> = serde_json::from_str(json)?;
        Ok(Self::new(path, pages))
    }

    /// Load a JSON array of pages from a file; the file becomes the source path.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        Self::from_json(path, &json)
    }

    /// Append a page.
    pub fn push(&mut self, page: RawPage) {
        self.pages.push(page);
    }
}

impl PageSource for MemorySource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn raw_page(&self, index: usize) -> Result<RawPage> {
        self.pages.get(index).cloned().ok_or(Error::OutOfRange {
            actual: self.pages.len(),
            requested: index + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_order() {
        let mut anchors = vec![100.0, 700.0, 400.0];
        anchors.sort_by(|a, b| CoordinateOrigin::BottomLeft.reading_order(*a, *b));
        assert_eq!(anchors, vec![700.0, 400.0, 100.0]);

        anchors.sort_by(|a, b| CoordinateOrigin::TopLeft.reading_order(*a, *b));
        assert_eq!(anchors, vec![100.0, 400.0, 700.0]);
    }

    #[test]
    fn test_distance_from_top() {
        let bbox = BBox::new(72.0, 700.0, 300.0, 712.0);
        assert_eq!(CoordinateOrigin::BottomLeft.distance_from_top(&bbox, 792.0), 80.0);
        assert_eq!(CoordinateOrigin::TopLeft.distance_from_top(&bbox, 792.0), 700.0);
        assert_eq!(CoordinateOrigin::BottomLeft.top_edge(&bbox), 712.0);
    }

    #[test]
    fn test_bbox_normalizes() {
        let bbox = BBox::new(10.0, 20.0, 5.0, 2.0);
        assert_eq!(bbox, BBox::new(5.0, 2.0, 10.0, 20.0));
        assert_eq!(bbox.width(), 5.0);
        assert_eq!(bbox.height(), 18.0);
    }

    #[test]
    fn test_memory_source_from_json() {
        let json = r#"[
            {"width": 612, "height": 792},
            {"width": 612, "height": 792, "origin": "top_left", "tables": [{"rows": [["a", "b"]], "anchor": 10}]}
        ]"#;
        let source = MemorySource::from_json("in.json", json).unwrap();
        assert_eq!(source.page_count(), 2);
        assert_eq!(source.path(), Path::new("in.json"));

        let second = source.raw_page(1).unwrap();
        assert_eq!(second.origin, CoordinateOrigin::TopLeft);
        assert_eq!(second.tables[0].first_row_text().as_deref(), Some("a b"));
    }

    #[test]
    fn test_memory_source_out_of_range() {
        let source = MemorySource::new("x", vec![RawPage::new(612.0, 792.0)]);
        assert!(matches!(
            source.raw_page(3),
            Err(Error::OutOfRange {
                actual: 1,
                requested: 4
            })
        ));
    }
}
