//! Document-level types.

use super::{Content, Page};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An extracted document: the source path and its pages in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Path of the source file
    pub source: PathBuf,

    /// Pages in the document
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a new empty document.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            pages: Vec::new(),
        }
    }

    /// Source file path.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Add a page to the document.
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Iterate over every block in document order.
    pub fn contents(&self) -> impl Iterator<Item = &Content> {
        self.pages.iter().flat_map(|page| page.contents.iter())
    }

    /// Mutable references to every block in document order.
    pub fn contents_mut(&mut self) -> impl Iterator<Item = &mut Content> {
        self.pages.iter_mut().flat_map(|page| page.contents.iter_mut())
    }

    /// Count blocks by translation state: (translated, untranslated).
    pub fn translation_summary(&self) -> (usize, usize) {
        self.contents()
            .filter(|c| c.is_translatable())
            .fold((0, 0), |(done, pending), c| {
                if c.status() {
                    (done + 1, pending)
                } else {
                    (done, pending + 1)
                }
            })
    }
}
