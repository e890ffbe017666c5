//! Real PDF parsing on documents generated with lopdf.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use tempfile::TempDir;

use talkpdf::rag::loader::{PdfExtractParser, PdfParser};
use talkpdf::types::{AppError, Document};

/// A PDF with one page per entry of `pages`, each holding a single line
fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[test]
fn test_extracts_text_per_page() {
    let bytes = build_pdf(&["The sky is blue.", "Grass is green."]);
    let pages = PdfExtractParser::new()
        .parse(&Document::new("colors.pdf", bytes))
        .unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].number, 1);
    assert_eq!(pages[1].number, 2);
    assert!(pages[0].text.contains("sky is blue"));
    assert!(pages[1].text.contains("Grass is green"));
    assert!(pages.iter().all(|p| p.document_id == "colors.pdf"));
}

#[test]
fn test_truncated_pdf_is_unreadable() {
    let mut bytes = build_pdf(&["The sky is blue."]);
    bytes.truncate(20);

    let result = PdfExtractParser::new().parse(&Document::new("cut.pdf", bytes));
    assert!(matches!(result, Err(AppError::UnreadableDocument(msg)) if msg.contains("cut.pdf")));
}

fn entries(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

#[test]
fn test_temp_file_removed_after_parse() {
    let dir = TempDir::new().unwrap();
    let parser = PdfExtractParser::with_temp_dir(dir.path());

    let pages = parser
        .parse(&Document::new("sky.pdf", build_pdf(&["The sky is blue."])))
        .unwrap();

    assert_eq!(pages.len(), 1);
    assert_eq!(entries(&dir), 0);
}

#[test]
fn test_temp_file_removed_after_failed_parse() {
    let dir = TempDir::new().unwrap();
    let parser = PdfExtractParser::with_temp_dir(dir.path());
    let mut bytes = build_pdf(&["The sky is blue."]);
    bytes.truncate(20);

    let result = parser.parse(&Document::new("cut.pdf", bytes));

    assert!(matches!(result, Err(AppError::UnreadableDocument(_))));
    assert_eq!(entries(&dir), 0);
}
