use lopdf::Document;
use tracing::debug;

use super::{DocumentFormat, ExtractError};

/// Extracts text page by page, in page order, joined by newlines.
/// A page without extractable text (e.g. a scanned image) contributes an empty string.
pub(super) fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc =
        Document::load_mem(bytes).map_err(|e| ExtractError::failure(DocumentFormat::Pdf, e))?;

    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Err(ExtractError::failure(
            DocumentFormat::Pdf,
            "document has no pages",
        ));
    }

    let texts: Vec<String> = pages
        .iter()
        .map(|&page| match doc.extract_text(&[page]) {
            Ok(text) => text,
            Err(e) => {
                debug!("No extractable text on PDF page {page}: {e}");
                String::new()
            }
        })
        .collect();

    Ok(texts.join("\n"))
}

#[cfg(test)]
mod tests {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    use super::*;

    /// Builds a PDF whose pages each show one line of text; `None` yields a page with no content.
    fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            };
            if let Some(text) = text {
                let content = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 12.into()]),
                        Operation::new("Td", vec![72.into(), 720.into()]),
                        Operation::new("Tj", vec![Object::string_literal(*text)]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let content_id =
                    doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
                page.set("Contents", content_id);
            }
            kids.push(doc.add_object(page).into());
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

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_extracts_pages_in_order() {
        let bytes = build_pdf(&[Some("Experience"), Some("Skills")]);
        let text = extract_pdf_text(&bytes).unwrap();
        let experience = text.find("Experience").expect("first page text");
        let skills = text.find("Skills").expect("second page text");
        assert!(experience < skills);
    }

    #[test]
    fn test_page_without_text_is_not_a_failure() {
        let bytes = build_pdf(&[None, Some("Skills")]);
        let text = extract_pdf_text(&bytes).unwrap();
        assert!(text.contains("Skills"));
    }

    #[test]
    fn test_malformed_pdf_is_extraction_failure() {
        let err = extract_pdf_text(b"%PDF-1.5 this is not really a pdf").unwrap_err();
        assert!(matches!(
            err,
            ExtractError::ExtractionFailure {
                format: DocumentFormat::Pdf,
                ..
            }
        ));
    }
}
