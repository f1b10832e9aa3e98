//! Output format and writer options.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Output artifact format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Paginated PDF document
    #[default]
    Pdf,

    /// Flat Markdown
    Markdown,
}

impl OutputFormat {
    /// File extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Markdown => "md",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Pdf => f.write_str("pdf"),
            OutputFormat::Markdown => f.write_str("markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Default output path: the source path with its extension replaced by
/// `_translated.<ext>`.
pub fn default_output_path(source: &Path, format: OutputFormat) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    source.with_file_name(format!("{}_translated.{}", stem, format.extension()))
}

/// Options for writing a translated document.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Output format
    pub format: OutputFormat,

    /// Output path (`None` = derived from the source path)
    pub output_path: Option<PathBuf>,

    /// TrueType/OpenType font used instead of Helvetica
    pub font_path: Option<PathBuf>,

    /// Document title for PDF metadata
    pub title: Option<String>,
}

impl WriteOptions {
    /// Create new write options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the output path.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Set the substitution font.
    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    /// Set the PDF title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Where the artifact for `source` will be written.
    pub fn resolve_output_path(&self, source: &Path) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| default_output_path(source, self.format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!("markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("Md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);

        let err = "docx".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref f) if f == "docx"));
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/books/novel.pdf"), OutputFormat::Pdf),
            PathBuf::from("/books/novel_translated.pdf")
        );
        assert_eq!(
            default_output_path(Path::new("report.PDF"), OutputFormat::Markdown),
            PathBuf::from("report_translated.md")
        );
    }

    #[test]
    fn test_resolve_output_path() {
        let options = WriteOptions::new().with_format(OutputFormat::Markdown);
        assert_eq!(
            options.resolve_output_path(Path::new("a.pdf")),
            PathBuf::from("a_translated.md")
        );

        let options = options.with_output_path("out/custom.md");
        assert_eq!(
            options.resolve_output_path(Path::new("a.pdf")),
            PathBuf::from("out/custom.md")
        );
    }
}
