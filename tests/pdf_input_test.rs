//! PDF files through the whole pipeline: lopdf-built input, Markdown out.

use std::fs;
use std::path::Path;

use lopdf::content::{Content as PageContent, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use pdftrans::{
    create_translator, Content, ModelConfig, ModelType, OutputFormat, PdfTrans, WriteOptions,
};
use tempfile::TempDir;

fn text_stream(text: &str, y: i64, compress: bool) -> Stream {
    let content = PageContent {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let mut stream = Stream::new(dictionary! {}, content.encode().unwrap());
    if compress {
        let packed = {
            use std::io::Write;
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&stream.content).unwrap();
            encoder.finish().unwrap()
        };
        stream.dict.set("Filter", "FlateDecode");
        stream.set_content(packed);
    }
    stream
}

fn add_page(doc: &mut Document, pages_id: ObjectId, font_id: ObjectId, contents: Object) -> Object {
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => contents,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
    })
    .into()
}

/// Page 1 holds a compressed and an unfiltered stream; page 2 a single unfiltered one.
fn write_report(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let packed = doc.add_object(text_stream("Quarterly results were better.", 700, true));
    let plain = doc.add_object(text_stream("Closing remarks.", 650, false));
    let first = add_page(
        &mut doc,
        pages_id,
        font_id,
        Object::Array(vec![packed.into(), plain.into()]),
    );

    let single = doc.add_object(text_stream("Second page.", 700, false));
    let second = add_page(&mut doc, pages_id, font_id, single.into());

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![first, second],
            "Count" => 2,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

#[test]
fn test_extracts_compressed_and_plain_streams() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.pdf");
    write_report(&path);

    let doc = pdftrans::extract_file(&path).unwrap();
    assert_eq!(doc.page_count(), 2);

    let first: Vec<_> = doc.pages[0]
        .contents
        .iter()
        .map(|content| match content {
            Content::Text(text) => text.original.clone(),
            other => panic!("expected text, got {}", other.kind()),
        })
        .collect();
    assert_eq!(first, vec!["Quarterly results were better.", "Closing remarks."]);

    let anchors: Vec<_> = doc.pages[0].contents.iter().map(Content::anchor).collect();
    assert!(anchors[0] > anchors[1]);
}

#[test]
fn test_pdf_to_markdown() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.pdf");
    write_report(&path);

    let translator = create_translator(&ModelConfig::new(ModelType::Echo)).unwrap();
    let summary = PdfTrans::new()
        .with_write_options(WriteOptions::new().with_format(OutputFormat::Markdown))
        .run(&path, &translator)
        .unwrap();

    assert_eq!(summary.output, dir.path().join("report_translated.md"));
    assert_eq!(summary.report.translated, 3);
    assert_eq!(
        fs::read_to_string(&summary.output).unwrap(),
        "Quarterly results were better.\n\nClosing remarks.\n\n---\n\nSecond page.\n\n"
    );
}

#[test]
fn test_translated_pdf_reads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.pdf");
    write_report(&path);

    let translator = create_translator(&ModelConfig::new(ModelType::Echo)).unwrap();
    let summary = PdfTrans::new().run(&path, &translator).unwrap();
    assert_eq!(summary.output, dir.path().join("report_translated.pdf"));

    let again = pdftrans::extract_file(&summary.output).unwrap();
    assert_eq!(again.page_count(), 2);
    let text: Vec<_> = again
        .contents()
        .filter_map(|content| match content {
            Content::Text(text) => Some(text.original.clone()),
            _ => None,
        })
        .collect();
    assert!(text.iter().any(|t| t.contains("Closing")), "got {:?}", text);
}
