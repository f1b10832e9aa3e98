//! Content blocks: the unit of extraction, translation and rendering.

use super::Grid;
use serde::{Deserialize, Serialize};

/// Default gap above a block, in points.
pub const DEFAULT_SPACE_BEFORE: f32 = 5.0;

/// An sRGB fill color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    /// Create a color from 8-bit channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from unit-interval RGB components.
    pub fn from_unit_rgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: unit_to_byte(r),
            g: unit_to_byte(g),
            b: unit_to_byte(b),
        }
    }

    /// Create a color from a unit-interval gray level.
    pub fn from_gray(level: f32) -> Self {
        Self::from_unit_rgb(level, level, level)
    }

    /// Create a color from unit-interval CMYK components.
    pub fn from_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self::from_unit_rgb(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        )
    }

    /// Components as unit-interval floats.
    pub fn to_unit_rgb(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

fn unit_to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Raster formats an image block may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    WebP,
}

impl ImageFormat {
    /// File extension used when staging the image on disk.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::WebP => "webp",
        }
    }
}

/// Visual attributes of a text block, inferred from glyph statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font size in points
    pub font_size: f32,
    /// Whether the dominant font is bold
    pub bold: bool,
    /// Baseline-to-baseline distance in points
    pub leading: f32,
    /// First-line indent relative to the left margin, in points
    pub first_line_indent: f32,
    /// Text fill color
    pub color: Color,
    /// Gap above the paragraph, in points
    pub space_before: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            bold: false,
            leading: 14.4,
            first_line_indent: 0.0,
            color: Color::BLACK,
            space_before: DEFAULT_SPACE_BEFORE,
        }
    }
}

/// A paragraph of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// Source text
    pub original: String,
    /// Translated text, once set
    pub translation: Option<String>,
    /// Whether `translation` holds a usable value
    pub status: bool,
    /// Page-space y used for ordering
    pub anchor: f32,
    /// Visual attributes
    pub style: TextStyle,
}

impl TextContent {
    /// Create an untranslated text block.
    pub fn new(original: impl Into<String>, anchor: f32, style: TextStyle) -> Self {
        Self {
            original: original.into(),
            translation: None,
            status: false,
            anchor,
            style,
        }
    }

    /// Store a model reply verbatim.
    pub fn set_translation(&mut self, text: String, success: bool) {
        self.translation = Some(text);
        self.status = success;
    }

    /// The translated text, if the block is translated.
    pub fn translated(&self) -> Option<&str> {
        if self.status {
            self.translation.as_deref()
        } else {
            None
        }
    }
}

/// A table with a rectangular cell grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableContent {
    /// Source cells
    pub original: Grid,
    /// Translated cells, once parsed
    pub translation: Option<Grid>,
    /// Whether `translation` holds a usable value
    pub status: bool,
    /// Page-space y used for ordering
    pub anchor: f32,
    /// Column widths in points, one per column
    pub col_widths: Vec<f32>,
    /// Gap above the table, in points
    pub space_before: f32,
}

impl TableContent {
    /// Create an untranslated table block.
    pub fn new(original: Grid, anchor: f32, col_widths: Vec<f32>) -> Self {
        Self {
            original,
            translation: None,
            status: false,
            anchor,
            col_widths,
            space_before: DEFAULT_SPACE_BEFORE,
        }
    }

    /// Store parsed translated cells.
    pub fn set_translation(&mut self, grid: Grid, success: bool) {
        self.translation = Some(grid);
        self.status = success;
    }

    /// Mark the block as untranslated after an unusable reply.
    pub fn clear_translation(&mut self) {
        self.translation = None;
        self.status = false;
    }

    /// The translated grid, if the block is translated.
    pub fn translated(&self) -> Option<&Grid> {
        if self.status {
            self.translation.as_ref()
        } else {
            None
        }
    }
}

/// An embedded raster image, passed through untranslated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Encoded image bytes
    #[serde(skip_serializing, default)]
    pub data: Vec<u8>,
    /// Display width in points
    pub width: f32,
    /// Display height in points
    pub height: f32,
    /// Declared source format, if known
    pub format: Option<ImageFormat>,
    /// Page-space y of the image's top edge
    pub anchor: f32,
}

impl ImageContent {
    /// Create an image block.
    pub fn new(data: Vec<u8>, width: f32, height: f32, anchor: f32) -> Self {
        Self {
            data,
            width,
            height,
            format: None,
            anchor,
        }
    }

    /// Set the declared source format.
    pub fn with_format(mut self, format: Option<ImageFormat>) -> Self {
        self.format = format;
        self
    }
}

/// One addressable unit of page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text(TextContent),
    Table(TableContent),
    Image(ImageContent),
}

impl Content {
    /// Page-space y used for ordering.
    pub fn anchor(&self) -> f32 {
        match self {
            Content::Text(t) => t.anchor,
            Content::Table(t) => t.anchor,
            Content::Image(i) => i.anchor,
        }
    }

    /// Whether the block holds a usable translated value.
    ///
    /// Images are pass-through and always report `true`.
    pub fn status(&self) -> bool {
        match self {
            Content::Text(t) => t.status,
            Content::Table(t) => t.status,
            Content::Image(_) => true,
        }
    }

    /// Whether the block is sent to the translation backend.
    pub fn is_translatable(&self) -> bool {
        match self {
            Content::Text(_) | Content::Table(_) => true,
            Content::Image(_) => false,
        }
    }

    /// Short lowercase name of the block kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::Table(_) => "table",
            Content::Image(_) => "image",
        }
    }
}

impl From<TextContent> for Content {
    fn from(content: TextContent) -> Self {
        Content::Text(content)
    }
}

impl From<TableContent> for Content {
    fn from(content: TableContent) -> Self {
        Content::Table(content)
    }
}

impl From<ImageContent> for Content {
    fn from(content: ImageContent) -> Self {
        Content::Image(content)
    }
}
