//! End-to-end tests: primitives in, translated artifact out.

use std::fs;

use pdftrans::source::{BBox, Glyph, RawTable, TextLine};
use pdftrans::{
    create_translator, Color, Content, Error, ExtractOptions, LayoutExtractor, MemorySource,
    ModelConfig, ModelType, OutputFormat, PageSource, PdfTrans, RawPage, Reply, Translate,
    TranslateOptions, WriteOptions,
};
use tempfile::TempDir;

fn line(text: &str, x0: f32, x1: f32, y: f32) -> TextLine {
    let glyph = |x: f32| Glyph {
        text: "x".to_string(),
        x0: x,
        x1: x + 6.0,
        y0: y,
        y1: y + 12.0,
        size: 12.0,
        font: "Helvetica".to_string(),
        color: Color::BLACK,
    };
    TextLine {
        text: text.to_string(),
        bbox: BBox::new(x0, y, x1, y + 12.0),
        chars: vec![glyph(x0), glyph(x1 - 6.0)],
    }
}

fn report_page() -> RawPage {
    let mut page = RawPage::new(612.0, 792.0);
    page.lines = vec![
        line("Quarterly results were", 72.0, 540.0, 700.0),
        line("better than expected.", 72.0, 300.0, 685.0),
        line("Item Count", 72.0, 300.0, 650.0),
        line("Apples 3", 72.0, 300.0, 635.0),
        line("Closing remarks.", 72.0, 250.0, 600.0),
    ];
    page.tables = vec![RawTable {
        rows: vec![
            vec!["Item".into(), "Count".into()],
            vec!["Apples".into(), "3".into()],
        ],
        anchor: 650.0,
    }];
    page
}

fn source(dir: &TempDir, pages: usize) -> MemorySource {
    let pages = (0..pages).map(|_| report_page()).collect();
    MemorySource::new(dir.path().join("report.pdf"), pages)
}

fn echo() -> Box<dyn Translate> {
    create_translator(&ModelConfig::new(ModelType::Echo)).unwrap()
}

struct Upper;

impl Translate for Upper {
    fn name(&self) -> &str {
        "upper"
    }

    fn translate(&self, prompt: &str) -> pdftrans::Result<Reply> {
        let content = pdftrans::translate::prompt::prompt_content(prompt);
        Ok(Reply::ok(content.to_uppercase()))
    }
}

#[test]
fn test_extract_orders_text_table_text() {
    let dir = TempDir::new().unwrap();
    let doc = LayoutExtractor::new().extract(&source(&dir, 1)).unwrap();

    assert_eq!(doc.page_count(), 1);
    let kinds: Vec<_> = doc.contents().map(Content::kind).collect();
    assert_eq!(kinds, vec!["text", "table", "text"]);

    let anchors: Vec<_> = doc.contents().map(Content::anchor).collect();
    assert!(anchors.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_requesting_too_many_pages_fails() {
    let dir = TempDir::new().unwrap();
    let extractor = LayoutExtractor::with_options(ExtractOptions::new().with_pages(10));

    match extractor.extract(&source(&dir, 5)) {
        Err(Error::OutOfRange { actual, requested }) => {
            assert_eq!(actual, 5);
            assert_eq!(requested, 10);
        }
        other => panic!("expected OutOfRange, got {:?}", other.map(|d| d.page_count())),
    }
}

#[test]
fn test_page_limit_takes_leading_pages() {
    let dir = TempDir::new().unwrap();
    let extractor = LayoutExtractor::with_options(ExtractOptions::new().with_pages(2));
    let doc = extractor.extract(&source(&dir, 5)).unwrap();

    let numbers: Vec<_> = doc.pages.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[test]
fn test_extraction_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let src = source(&dir, 3);

    let parallel = LayoutExtractor::new().extract(&src).unwrap();
    let sequential = LayoutExtractor::with_options(ExtractOptions::new().sequential())
        .extract(&src)
        .unwrap();
    assert_eq!(parallel, sequential);
}

#[test]
fn test_json_primitives_round_trip_into_extractor() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pages.json");
    fs::write(&path, serde_json::to_string(&vec![report_page()]).unwrap()).unwrap();

    let src = MemorySource::from_json_file(&path).unwrap();
    assert_eq!(src.page_count(), 1);
    assert_eq!(src.path(), path.as_path());

    let doc = LayoutExtractor::new().extract(&src).unwrap();
    assert_eq!(doc.contents().count(), 3);
}

#[test]
fn test_markdown_pipeline_with_echo_model() {
    let dir = TempDir::new().unwrap();
    let summary = PdfTrans::new()
        .with_write_options(WriteOptions::new().with_format(OutputFormat::Markdown))
        .run_source(&source(&dir, 2), &echo())
        .unwrap();

    assert_eq!(summary.output, dir.path().join("report_translated.md"));
    assert_eq!(summary.report.translated, 6);
    assert_eq!(summary.report.failed, 0);

    let markdown = fs::read_to_string(&summary.output).unwrap();
    let expected_page = "Quarterly results were better than expected.\n\n\
                         | Item | Count |\n| --- | --- |\n| Apples | 3 |\n\n\
                         Closing remarks.\n\n";
    assert_eq!(markdown, format!("{expected_page}---\n\n{expected_page}"));
}

#[test]
fn test_pdf_pipeline_writes_one_page_per_source_page() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out").join("translated.pdf");
    let summary = PdfTrans::new()
        .with_translate_options(TranslateOptions::new("German").with_concurrency(2))
        .with_write_options(WriteOptions::new().with_output_path(&output))
        .run_source(&source(&dir, 3), &Upper)
        .unwrap();

    assert_eq!(summary.output, output);
    let bytes = fs::read(&output).unwrap();
    assert!(pdftrans::is_pdf_bytes(&bytes));
    let pdf = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(pdf.get_pages().len(), 3);
}

#[test]
fn test_failed_translation_writes_nothing() {
    struct Broken;

    impl Translate for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn translate(&self, _prompt: &str) -> pdftrans::Result<Reply> {
            Err(Error::Request("connection refused".to_string()))
        }
    }

    let dir = TempDir::new().unwrap();
    let result = PdfTrans::new()
        .with_write_options(WriteOptions::new().with_format(OutputFormat::Markdown))
        .run_source(&source(&dir, 1), &Broken);

    assert!(matches!(result, Err(Error::Request(_))));
    assert!(!dir.path().join("report_translated.md").exists());
}

#[test]
fn test_non_pdf_input_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.pdf");
    fs::write(&path, b"plain text, not a pdf").unwrap();

    assert!(pdftrans::extract_file(&path).is_err());
}
