//! Writers for translated documents.

mod images;
mod markdown;
mod options;
mod pdf;

use std::fs;
use std::path::PathBuf;

use crate::error::Result;
use crate::model::Document;

pub use images::{ImageStager, StagedImage};
pub use markdown::{to_markdown, MarkdownRenderer};
pub use options::{default_output_path, OutputFormat, WriteOptions};
pub use pdf::{to_pdf, PdfWriter};

/// Render `doc` and write the artifact, returning its path.
///
/// The artifact is rendered in memory first, so a failed render leaves
/// nothing on disk.
pub fn write_document(doc: &Document, options: &WriteOptions) -> Result<PathBuf> {
    let path = options.resolve_output_path(doc.source());

    log::info!("Writing {} output to {}", options.format, path.display());
    let bytes = match options.format {
        OutputFormat::Markdown => to_markdown(doc).into_bytes(),
        OutputFormat::Pdf => PdfWriter::new(options.clone()).render(doc)?,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, bytes)?;

    let (translated, untranslated) = doc.translation_summary();
    log::info!(
        "Wrote {} ({} blocks translated, {} omitted)",
        path.display(),
        translated,
        untranslated
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Margins, Page, TextContent, TextStyle};
    use tempfile::TempDir;

    fn document(source: PathBuf) -> Document {
        let mut page = Page::new(
            1,
            612.0,
            792.0,
            Margins {
                left: 72.0,
                right: 540.0,
                top: 72.0,
                bottom: 72.0,
            },
        );
        let mut text = TextContent::new("Hello.", 700.0, TextStyle::default());
        text.set_translation("Hallo.".to_string(), true);
        page.add_content(text);
        let mut doc = Document::new(source);
        doc.add_page(page);
        doc
    }

    #[test]
    fn test_write_markdown_next_to_source() {
        let dir = TempDir::new().unwrap();
        let doc = document(dir.path().join("book.pdf"));
        let options = WriteOptions::new().with_format(OutputFormat::Markdown);

        let path = write_document(&doc, &options).unwrap();
        assert_eq!(path, dir.path().join("book_translated.md"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "Hallo.\n\n");
    }

    #[test]
    fn test_write_pdf_to_explicit_path() {
        let dir = TempDir::new().unwrap();
        let doc = document(dir.path().join("book.pdf"));
        let target = dir.path().join("out").join("result.pdf");
        let options = WriteOptions::new().with_output_path(&target);

        let path = write_document(&doc, &options).unwrap();
        assert_eq!(path, target);
        assert!(fs::read(&path).unwrap().starts_with(b"%PDF"));
    }
}
