//! Page-level types.

use super::Content;
use serde::{Deserialize, Serialize};

/// Page margins inferred during extraction.
///
/// `left` and `right` are the x coordinates of the text column edges;
/// `top` and `bottom` are distances from the page's top and bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Margins {
    /// Width of the text column between the left and right edges.
    pub fn column_width(&self) -> f32 {
        (self.right - self.left).max(0.0)
    }

    /// Right margin expressed as a distance from the page's right edge.
    pub fn right_inset(&self, page_width: f32) -> f32 {
        (page_width - self.right).max(0.0)
    }
}

/// A single page in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Margins inferred from the source layout
    pub margins: Margins,

    /// Content blocks in reading order
    pub contents: Vec<Content>,
}

impl Page {
    /// Create an empty page.
    pub fn new(number: u32, width: f32, height: f32, margins: Margins) -> Self {
        Self {
            number,
            width,
            height,
            margins,
            contents: Vec::new(),
        }
    }

    /// Add a content block.
    pub fn add_content(&mut self, content: impl Into<Content>) {
        self.contents.push(content.into());
    }

    /// Check if the page has no content blocks.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Number of blocks that hold a usable translation (images included).
    pub fn translated_count(&self) -> usize {
        self.contents.iter().filter(|c| c.status()).count()
    }
}
