//! PDF page source backed by lopdf.

use std::path::{Path, PathBuf};

use super::backend::{LopdfBackend, PageId, PdfBackend};
use super::interpreter::Interpreter;
use super::lines::group_into_lines;
use super::table_detector::TableDetector;
use super::{CoordinateOrigin, PageSource, RawImage, RawPage};
use crate::detect::pdf_version_from_path;
use crate::error::{Error, Result};

/// Reads positional primitives from a PDF file.
///
/// Coordinates are PDF user space, so pages report
/// [`CoordinateOrigin::BottomLeft`].
pub struct PdfSource {
    path: PathBuf,
    backend: LopdfBackend,
    pages: Vec<PageId>,
    detector: TableDetector,
}

impl PdfSource {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let version = pdf_version_from_path(path)?;
        log::debug!("Opening {} (PDF {})", path.display(), version);

        let backend = LopdfBackend::load_file(path)?;
        Ok(Self::with_backend(path, backend))
    }

    /// Read a PDF held in memory; `path` labels the document.
    pub fn from_bytes(path: impl Into<PathBuf>, data: &[u8]) -> Result<Self> {
        crate::detect::pdf_version_from_bytes(data)?;
        let backend = LopdfBackend::load_bytes(data)?;
        Ok(Self::with_backend(path, backend))
    }

    fn with_backend(path: impl Into<PathBuf>, backend: LopdfBackend) -> Self {
        if backend.is_encrypted() {
            log::warn!("Document is encrypted; extracted text may be unreadable");
        }
        let pages = backend.pages().into_values().collect();
        Self {
            path: path.into(),
            backend,
            pages,
            detector: TableDetector::new(),
        }
    }

    /// Replace the table detector.
    pub fn with_table_detector(mut self, detector: TableDetector) -> Self {
        self.detector = detector;
        self
    }

    /// PDF version from the loaded document.
    pub fn version(&self) -> String {
        self.backend.version()
    }
}

impl PageSource for PdfSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn raw_page(&self, index: usize) -> Result<RawPage> {
        let page = *self.pages.get(index).ok_or(Error::OutOfRange {
            actual: self.pages.len(),
            requested: index + 1,
        })?;

        let (width, height) = self.backend.page_size(page);
        let fonts = self.backend.page_fonts(page)?;
        let content = self.backend.page_content(page)?;
        let ops = self.backend.decode_content(&content)?;

        let decode = |font: &[u8], bytes: &[u8]| self.backend.decode_text(page, font, bytes);
        let marks = Interpreter::new(&fonts, &decode).run(&ops);

        let lines = group_into_lines(marks.glyphs);
        let tables = self.detector.detect(&lines);

        let images = marks
            .images
            .into_iter()
            .filter_map(|placement| {
                let image = self.backend.image(page, &placement.name)?;
                Some(RawImage {
                    bytes: image.data,
                    width: placement.bbox.width(),
                    height: placement.bbox.height(),
                    format: image.format,
                    bbox: placement.bbox,
                })
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Page {}: {} lines, {} tables, {} images",
            index + 1,
            lines.len(),
            tables.len(),
            images.len()
        );

        Ok(RawPage {
            width,
            height,
            origin: CoordinateOrigin::BottomLeft,
            lines,
            tables,
            images,
        })
    }
}
