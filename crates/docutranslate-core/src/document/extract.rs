use lopdf::Document;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Leading bytes of every PDF file
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Reject uploads that are too large or not PDFs before parsing them
pub fn check_upload(bytes: &[u8], max_bytes: u64) -> Result<()> {
    if bytes.len() as u64 > max_bytes {
        return Err(Error::DocumentRejected(format!(
            "file too large. Maximum size: {} MB",
            max_bytes / 1024 / 1024
        )));
    }
    if !bytes.starts_with(PDF_SIGNATURE) {
        return Err(Error::DocumentRejected("the file is not a valid PDF".to_string()));
    }
    Ok(())
}

/// Text layer of a PDF document
pub struct PdfText {
    doc: Document,
    page_numbers: Vec<u32>,
}

impl PdfText {
    /// Parse a PDF from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| Error::Extraction(format!("failed to parse PDF: {e}")))?;
        if doc.is_encrypted() {
            return Err(Error::Extraction("the document is encrypted".to_string()));
        }
        let page_numbers = doc.get_pages().into_keys().collect();
        Ok(Self { doc, page_numbers })
    }

    /// Read and parse a local PDF, applying the upload checks first
    pub fn from_file(path: impl AsRef<Path>, max_bytes: u64) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        check_upload(&bytes, max_bytes)?;
        Self::from_bytes(&bytes)
    }

    pub fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    /// Per-page text, extracted on demand in page order
    pub fn pages(&self) -> impl Iterator<Item = Result<String>> + '_ {
        self.page_numbers.iter().map(|&page| {
            self.doc
                .extract_text(&[page])
                .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
                .map_err(|e| Error::Extraction(format!("page {page}: {e}")))
        })
    }

    /// Whole document text, pages joined by a single space.
    ///
    /// Pages that fail to decode are skipped; the call only fails when no
    /// text is left at all.
    pub fn full_text(&self) -> Result<String> {
        let mut pages = Vec::with_capacity(self.page_numbers.len());
        for page in self.pages() {
            match page {
                Ok(text) if !text.is_empty() => pages.push(text),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable page: {}", e),
            }
        }

        let text = pages.join(" ").trim().to_string();
        if text.is_empty() {
            return Err(Error::Extraction(
                "no text found, the document may be a scanned image".to_string(),
            ));
        }
        debug!("Extracted {} chars from {} pages", text.chars().count(), self.page_count());
        Ok(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream};

    /// Build a PDF with one page per entry, each showing the given text
    pub(crate) fn create_test_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let page_tree_id = doc.new_object_id();

        let font_id = doc.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));
        let resources_id = doc.add_object(lopdf::Dictionary::from_iter([(
            "Font",
            Object::Dictionary(lopdf::Dictionary::from_iter([("F1", Object::Reference(font_id))])),
        )]));

        let mut kids = Vec::new();
        for text in pages {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations }.encode().unwrap();
            let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content));
            let page_id = doc.add_object(lopdf::Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(page_tree_id)),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Reference(resources_id)),
                ("MediaBox", Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()])),
            ]));
            kids.push(Object::Reference(page_id));
        }

        let count = i64::try_from(kids.len()).unwrap();
        doc.objects.insert(
            page_tree_id,
            Object::Dictionary(lopdf::Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(count)),
            ])),
        );
        let catalog_id = doc.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(page_tree_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut output = Vec::new();
        doc.save_to(&mut output).unwrap();
        output
    }

    #[test]
    fn test_full_text_joins_pages() {
        let pdf = create_test_pdf(&["Hello world.", "This is a test."]);
        let text = PdfText::from_bytes(&pdf).unwrap();
        assert_eq!(text.page_count(), 2);
        assert_eq!(text.full_text().unwrap(), "Hello world. This is a test.");
    }

    #[test]
    fn test_blank_document_is_extraction_error() {
        let pdf = create_test_pdf(&[""]);
        let err = PdfText::from_bytes(&pdf).unwrap().full_text().unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert!(err.to_string().contains("scanned image"));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(PdfText::from_bytes(b"%PDF-1.5 not really").is_err());
        assert!(matches!(
            check_upload(b"<html></html>", 1024),
            Err(Error::DocumentRejected(_))
        ));
    }

    #[test]
    fn test_upload_size_cap() {
        let pdf = create_test_pdf(&["Hello"]);
        assert!(check_upload(&pdf, 10 * 1024 * 1024).is_ok());
        assert!(matches!(check_upload(&pdf, 16), Err(Error::DocumentRejected(_))));
    }
}
