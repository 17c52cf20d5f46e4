//! Plain-text extraction from uploaded documents.

use crate::document::FileKind;
use crate::error::{RagError, Result};

/// Turns raw document bytes into text.
///
/// Extraction is CPU-bound and synchronous; the document store runs it on a
/// blocking thread. Failures are [`RagError::ExtractionError`] naming `file_name`.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, file_name: &str, bytes: &[u8], kind: FileKind) -> Result<String>;
}

/// Extracts UTF-8 text files as-is and PDFs page by page with `lopdf`.
///
/// Each PDF page is preceded by a `--- Page N ---` marker line.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTextExtractor;

impl TextExtractor for DefaultTextExtractor {
    fn extract_text(&self, file_name: &str, bytes: &[u8], kind: FileKind) -> Result<String> {
        let extracted = match kind {
            FileKind::Text => decode_text(bytes),
            FileKind::Pdf => extract_pdf(bytes),
        };
        extracted.map_err(|message| RagError::ExtractionError { file: file_name.to_string(), message })
    }
}

fn decode_text(bytes: &[u8]) -> std::result::Result<String, String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|e| format!("file is not valid UTF-8: {e}"))
}

fn extract_pdf(bytes: &[u8]) -> std::result::Result<String, String> {
    let document =
        lopdf::Document::load_mem(bytes).map_err(|e| format!("failed to parse PDF: {e}"))?;

    let mut text = String::new();
    for page_number in document.get_pages().into_keys() {
        let page_text = document
            .extract_text(&[page_number])
            .map_err(|e| format!("failed to extract page {page_number}: {e}"))?;
        text.push_str(&format!("\n--- Page {page_number} ---\n"));
        text.push_str(&page_text);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    use super::*;

    /// A minimal PDF with one line of Helvetica text per page.
    fn pdf_with_pages(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
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
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
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

    fn message(err: RagError) -> String {
        match err {
            RagError::ExtractionError { message, .. } => message,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn text_is_decoded_and_bom_stripped() {
        let extractor = DefaultTextExtractor;
        let text = extractor.extract_text("a.txt", b"\xEF\xBB\xBFhello", FileKind::Text).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = DefaultTextExtractor
            .extract_text("a.txt", &[0xff, 0xfe, 0x00], FileKind::Text)
            .unwrap_err();
        assert!(matches!(&err, RagError::ExtractionError { file, .. } if file == "a.txt"));
        assert!(message(err).contains("UTF-8"));
    }

    #[test]
    fn garbage_pdf_is_rejected() {
        let err = DefaultTextExtractor.extract_text("a.pdf", b"not a pdf", FileKind::Pdf).unwrap_err();
        assert!(message(err).starts_with("failed to parse PDF"));
    }

    #[test]
    fn pdf_pages_are_marked_in_order() {
        let bytes = pdf_with_pages(&["Clouds drift east", "Rain follows at noon"]);
        let text = DefaultTextExtractor.extract_text("weather.pdf", &bytes, FileKind::Pdf).unwrap();

        let positions: Vec<usize> =
            ["--- Page 1 ---", "Clouds drift east", "--- Page 2 ---", "Rain follows at noon"]
                .iter()
                .map(|needle| text.find(needle).unwrap_or_else(|| panic!("missing {needle:?} in {text:?}")))
                .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "out of order: {text:?}");
    }
}
