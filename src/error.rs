//! Error types for pdftrans.

use std::io;
use thiserror::Error;

/// Result type alias for pdftrans operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, translating or writing.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// More pages were requested than the document has.
    #[error("Requested {requested} pages but the document only has {actual}")]
    OutOfRange {
        /// Number of pages in the document
        actual: usize,
        /// Number of pages requested
        requested: usize,
    },

    /// A table grid whose rows differ in length.
    #[error("Table row {row} has {found} cells, expected {expected}")]
    RaggedTable {
        /// Index of the offending row
        row: usize,
        /// Cell count of the first row
        expected: usize,
        /// Cell count of the offending row
        found: usize,
    },

    /// The translation backend failed for good (retries exhausted or a
    /// non-recoverable transport fault).
    #[error("Translation request failed: {0}")]
    Request(String),

    /// A model reply could not be parsed into the expected shape.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// The requested output format is not supported.
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Error decoding an embedded image.
    #[error("Image decoding error: {0}")]
    ImageDecode(String),

    /// Error while producing the output artifact.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Request(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageDecode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::OutOfRange {
            actual: 5,
            requested: 10,
        };
        assert_eq!(
            err.to_string(),
            "Requested 10 pages but the document only has 5"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_ragged_table_display() {
        let err = Error::RaggedTable {
            row: 2,
            expected: 3,
            found: 1,
        };
        assert_eq!(err.to_string(), "Table row 2 has 1 cells, expected 3");
    }
}
