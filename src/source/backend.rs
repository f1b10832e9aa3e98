//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for PDF operations, isolating
//! the concrete PDF library (lopdf) from content-stream interpretation.

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use crate::error::{Error, Result};
use crate::model::ImageFormat;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// US Letter, used when a page declares no usable MediaBox.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Metrics of a font resource, enough to advance the text position.
#[derive(Debug, Clone, PartialEq)]
pub struct FontMetrics {
    /// Base font name (e.g., "Helvetica-Bold").
    pub base_font: String,
    /// First character code covered by `widths`.
    pub first_char: u32,
    /// Glyph widths in 1/1000 text space units.
    pub widths: Vec<f32>,
    /// Width for codes outside `widths`, if declared.
    pub missing_width: Option<f32>,
    /// Composite (Type0) font with multi-byte codes.
    pub composite: bool,
}

impl FontMetrics {
    /// Metrics for a font with no width information.
    pub fn unknown(base_font: impl Into<String>) -> Self {
        Self {
            base_font: base_font.into(),
            first_char: 0,
            widths: Vec::new(),
            missing_width: None,
            composite: false,
        }
    }

    /// Declared width of a single-byte code.
    pub fn width(&self, code: u32) -> Option<f32> {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .or(self.missing_width)
    }
}

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    pub fn new(operator: &str, operands: Vec<PdfValue>) -> Self {
        Self {
            operator: operator.to_string(),
            operands,
        }
    }

    /// Numeric operand at `index`.
    pub fn number(&self, index: usize) -> Option<f32> {
        self.operands.get(index).and_then(get_number_from_value)
    }

    /// All operands that are numbers, in order.
    pub fn numbers(&self) -> Vec<f32> {
        self.operands
            .iter()
            .filter_map(get_number_from_value)
            .collect()
    }
}

/// An image XObject, re-encoded into a format the writer can embed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub data: Vec<u8>,
    pub format: Option<ImageFormat>,
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, font metrics, content stream
/// decoding, text decoding and image lookup without exposing any concrete
/// PDF library types.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Page width and height in points.
    fn page_size(&self, page: PageId) -> (f32, f32);

    /// Font metrics keyed by resource name for a given page.
    fn page_fonts(&self, page: PageId) -> Result<HashMap<Vec<u8>, FontMetrics>>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Decode a text byte sequence using the font's encoding on the given page.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;

    /// Look up an image XObject by resource name.
    fn image(&self, page: PageId, name: &[u8]) -> Option<ImageData>;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Content stream bytes, decoded when the stream declares a filter.
fn stream_content(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    stream
        .decompressed_content()
        .map_err(|e| Error::PdfParse(e.to_string()))
}

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path)?;
        Ok(Self { doc })
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self { doc })
    }

    /// Check if the document is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj)? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Look up a page attribute, following the Parent chain for inherited keys.
    fn inherited(&self, page: PageId, key: &[u8]) -> Option<&Object> {
        let mut dict = self.doc.get_dictionary(page).ok()?;
        // Bounded walk guards against cyclic Parent links.
        for _ in 0..32 {
            if let Ok(value) = dict.get(key) {
                return self.resolve(value);
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn font_metrics(&self, dict: &Dictionary) -> FontMetrics {
        let base_font = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let composite = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| n == b"Type0")
            .unwrap_or(false);

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .map(|n| n.max(0) as u32)
            .unwrap_or(0);
        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| self.resolve(w).and_then(object_number).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();
        let missing_width = dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| self.resolve_dict(o))
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(object_number)
            .filter(|w| *w > 0.0);

        FontMetrics {
            base_font,
            first_char,
            widths,
            missing_width,
            composite,
        }
    }

    fn decode_image(&self, stream: &Stream) -> Option<ImageData> {
        let dict = &stream.dict;
        let subtype = dict.get(b"Subtype").ok()?.as_name().ok()?;
        if subtype != b"Image" {
            return None;
        }

        let filter = dict
            .get(b"Filter")
            .ok()
            .and_then(|f| match self.resolve(f)? {
                Object::Name(n) => Some(n.clone()),
                Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec),
                _ => None,
            })
            .unwrap_or_default();

        match filter.as_slice() {
            b"DCTDecode" => Some(ImageData {
                data: stream.content.clone(),
                format: Some(ImageFormat::Jpeg),
            }),
            b"JPXDecode" => {
                // The writer cannot decode JPEG 2000.
                log::debug!("Skipping JPEG 2000 image XObject");
                None
            }
            b"FlateDecode" | b"LZWDecode" | b"" => {
                let samples = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                match self.samples_to_png(dict, samples) {
                    Ok(png) => Some(ImageData {
                        data: png,
                        format: Some(ImageFormat::Png),
                    }),
                    Err(e) => {
                        log::debug!("Skipping image XObject: {}", e);
                        None
                    }
                }
            }
            other => {
                log::debug!(
                    "Skipping image XObject with filter {}",
                    String::from_utf8_lossy(other)
                );
                None
            }
        }
    }

    /// Re-encode 8-bit DeviceGray/DeviceRGB samples as PNG.
    fn samples_to_png(&self, dict: &Dictionary, samples: Vec<u8>) -> Result<Vec<u8>> {
        let int = |key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|o| self.resolve(o))
                .and_then(|o| o.as_i64().ok())
        };
        let width = int(b"Width").unwrap_or(0) as u32;
        let height = int(b"Height").unwrap_or(0) as u32;
        let bits = int(b"BitsPerComponent").unwrap_or(8);
        if bits != 8 {
            return Err(Error::ImageDecode(format!(
                "unsupported bit depth {}",
                bits
            )));
        }

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| match o {
                Object::Name(n) => Some(n.clone()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec),
                _ => None,
            })
            .unwrap_or_default();

        let image = match color_space.as_slice() {
            b"DeviceRGB" | b"CalRGB" => image::RgbImage::from_raw(width, height, samples)
                .map(image::DynamicImage::ImageRgb8),
            b"DeviceGray" | b"CalGray" => image::GrayImage::from_raw(width, height, samples)
                .map(image::DynamicImage::ImageLuma8),
            other => {
                return Err(Error::ImageDecode(format!(
                    "unsupported color space {}",
                    String::from_utf8_lossy(other)
                )))
            }
        }
        .ok_or_else(|| Error::ImageDecode("sample buffer too short".to_string()))?;

        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, image::ImageFormat::Png)?;
        Ok(png.into_inner())
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_size(&self, page: PageId) -> (f32, f32) {
        let media_box = self
            .inherited(page, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .filter(|arr| arr.len() >= 4)
            .map(|arr| {
                arr.iter()
                    .map(|v| self.resolve(v).and_then(object_number).unwrap_or(0.0))
                    .collect::<Vec<_>>()
            });

        match media_box {
            Some(b) if (b[2] - b[0]).abs() > 0.0 && (b[3] - b[1]).abs() > 0.0 => {
                ((b[2] - b[0]).abs(), (b[3] - b[1]).abs())
            }
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    fn page_fonts(&self, page: PageId) -> Result<HashMap<Vec<u8>, FontMetrics>> {
        let lopdf_fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(lopdf_fonts
            .iter()
            .map(|(name, dict)| (name.clone(), self.font_metrics(dict)))
            .collect())
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        // A page without Contents is blank.
        let Ok(contents) = page_dict.get(b"Contents") else {
            return Ok(Vec::new());
        };

        match self.resolve(contents) {
            Some(Object::Stream(s)) => stream_content(s),
            Some(Object::Array(arr)) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Some(Object::Stream(s)) = self.resolve(obj) {
                        content.extend_from_slice(&stream_content(s)?);
                        content.push(b' ');
                    }
                }
                Ok(content)
            }
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
        if let Ok(lopdf_fonts) = self.doc.get_page_fonts(page) {
            if let Some(font_dict) = lopdf_fonts.get(font_name) {
                if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                    if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                        return text;
                    }
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn image(&self, page: PageId, name: &[u8]) -> Option<ImageData> {
        let resources = self.resolve_dict(self.inherited(page, b"Resources")?)?;
        let xobjects = self.resolve_dict(resources.get(b"XObject").ok()?)?;
        match self.resolve(xobjects.get(name).ok()?)? {
            Object::Stream(stream) => self.decode_image(stream),
            _ => None,
        }
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

fn object_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_content_with_and_without_filter() {
        let data = b"BT /F1 12 Tf 72 700 Td (Hello) Tj ET".repeat(8);

        let plain = Stream::new(Dictionary::new(), data.clone());
        assert_eq!(stream_content(&plain).unwrap(), data);

        let mut packed = Stream::new(Dictionary::new(), data.clone());
        packed.compress().unwrap();
        assert!(packed.dict.get(b"Filter").is_ok());
        assert_eq!(stream_content(&packed).unwrap(), data);
    }

    fn image_stream(filter: &str, content: Vec<u8>) -> Stream {
        let mut dict = Dictionary::new();
        dict.set("Subtype", "Image");
        dict.set("Filter", filter);
        Stream::new(dict, content)
    }

    #[test]
    fn test_decode_image_by_filter() {
        let backend = LopdfBackend {
            doc: LopdfDocument::with_version("1.5"),
        };

        let jpeg = backend
            .decode_image(&image_stream("DCTDecode", vec![0xFF, 0xD8, 0xFF]))
            .unwrap();
        assert_eq!(jpeg.format, Some(ImageFormat::Jpeg));

        assert!(backend
            .decode_image(&image_stream("JPXDecode", vec![0, 0, 0, 12]))
            .is_none());
    }

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        // 0xE9 = 'é' in Latin-1
        let bytes = vec![0x48, 0x65, 0x6C, 0x6C, 0xE9];
        assert_eq!(decode_text_simple(&bytes), "Hellé");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_simple(&bytes), "Hi");
    }

    #[test]
    fn test_font_metrics_width() {
        let metrics = FontMetrics {
            base_font: "Test".to_string(),
            first_char: 32,
            widths: vec![250.0, 300.0],
            missing_width: None,
            composite: false,
        };
        assert_eq!(metrics.width(32), Some(250.0));
        assert_eq!(metrics.width(33), Some(300.0));
        assert_eq!(metrics.width(34), None);
        assert_eq!(metrics.width(10), None);
        assert_eq!(FontMetrics::unknown("X").width(65), None);
    }

    #[test]
    fn test_content_op_numbers() {
        let op = ContentOp::new(
            "Td",
            vec![PdfValue::Integer(72), PdfValue::Real(-14.5), PdfValue::Other],
        );
        assert_eq!(op.number(0), Some(72.0));
        assert_eq!(op.number(1), Some(-14.5));
        assert_eq!(op.number(2), None);
        assert_eq!(op.numbers(), vec![72.0, -14.5]);
    }
}
