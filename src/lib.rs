//! # pdftrans
//!
//! Layout-preserving PDF translation.
//!
//! The pipeline reads positional primitives from a page source, infers
//! paragraphs, tables and images with their visual attributes, sends text
//! and tables through a language model, and writes the result as a new PDF
//! or as Markdown.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdftrans::{create_translator, ModelConfig, ModelType, OutputFormat, PdfTrans};
//! use pdftrans::{TranslateOptions, WriteOptions};
//!
//! fn main() -> pdftrans::Result<()> {
//!     let translator = create_translator(&ModelConfig::new(ModelType::Echo))?;
//!
//!     let summary = PdfTrans::new()
//!         .with_translate_options(TranslateOptions::new("German"))
//!         .with_write_options(WriteOptions::new().with_format(OutputFormat::Markdown))
//!         .run("book.pdf", &translator)?;
//!
//!     println!("{} -> {}", summary.report.translated, summary.output.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Stages
//!
//! - [`source`]: page primitives from PDF files ([`PdfSource`]) or JSON ([`MemorySource`])
//! - [`extract`]: margins, paragraphs, tables and reading order ([`LayoutExtractor`])
//! - [`translate`]: prompts, model backends and reply parsing ([`TranslationOrchestrator`])
//! - [`render`]: PDF and Markdown writers ([`write_document`])

pub mod detect;
pub mod error;
pub mod extract;
pub mod model;
pub mod render;
pub mod source;
pub mod translate;

pub use detect::{is_pdf_bytes, pdf_version_from_bytes, pdf_version_from_path};
pub use error::{Error, Result};
pub use extract::{ErrorMode, ExtractOptions, LayoutExtractor};
pub use model::{
    Color, Content, Document, Grid, ImageContent, ImageFormat, Margins, Page, TableContent,
    TextContent, TextStyle,
};
pub use render::{default_output_path, write_document, OutputFormat, WriteOptions};
pub use source::{CoordinateOrigin, MemorySource, PageSource, PdfSource, RawPage};
pub use translate::models::{create_translator, ModelConfig, ModelType};
pub use translate::{
    translate_document, Reply, Translate, TranslateOptions, TranslationOrchestrator,
    TranslationReport,
};

use std::path::{Path, PathBuf};

/// Extract the layout of every page of a PDF file.
///
/// # Example
///
/// ```no_run
/// let doc = pdftrans::extract_file("book.pdf").unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    PdfTrans::new().extract_file(path)
}

/// Outcome of a full pipeline run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Path of the written artifact
    pub output: PathBuf,
    /// Per-block translation counts
    pub report: TranslationReport,
}

/// Extract, translate and write in one call.
#[derive(Debug, Clone, Default)]
pub struct PdfTrans {
    extract: ExtractOptions,
    translate: TranslateOptions,
    write: WriteOptions,
}

impl PdfTrans {
    /// Create a pipeline with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set extraction options.
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract = options;
        self
    }

    /// Set translation options.
    pub fn with_translate_options(mut self, options: TranslateOptions) -> Self {
        self.translate = options;
        self
    }

    /// Set writer options.
    pub fn with_write_options(mut self, options: WriteOptions) -> Self {
        self.write = options;
        self
    }

    /// Extract a PDF file.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let source = PdfSource::open(path)?;
        self.extract(&source)
    }

    /// Extract any page source.
    pub fn extract(&self, source: &dyn PageSource) -> Result<Document> {
        LayoutExtractor::with_options(self.extract.clone()).extract(source)
    }

    /// Translate a PDF file and write the result.
    pub fn run<P: AsRef<Path>>(&self, path: P, translator: &dyn Translate) -> Result<RunSummary> {
        let source = PdfSource::open(path)?;
        self.run_source(&source, translator)
    }

    /// Translate any page source and write the result.
    ///
    /// Nothing is written when extraction or translation fails.
    pub fn run_source(&self, source: &dyn PageSource, translator: &dyn Translate) -> Result<RunSummary> {
        let mut document = self.extract(source)?;
        let report = translate_document(&mut document, translator, self.translate.clone())?;
        let output = write_document(&document, &self.write)?;
        Ok(RunSummary { output, report })
    }
}
