//! Page counting for uploaded documents.

use thiserror::Error;

/// Errors from counting the pages of a document.
#[derive(Debug, Error)]
pub enum PageCountError {
    /// The document could not be parsed.
    #[error("could not read document: {0}")]
    Parse(String),

    /// No counter exists for this document type.
    #[error("cannot count pages of {0}")]
    Unsupported(String),
}

/// Determines how many pages a document will print as.
///
/// Runs on the blocking thread pool, so implementations may do CPU-heavy
/// parsing.
pub trait PageCounter: Send + Sync + 'static {
    /// Count the pages of `content`.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unsupported or the content is unreadable.
    fn count_pages(&self, mime_type: &str, content: &[u8]) -> Result<u32, PageCountError>;
}

/// Counts PDF pages with `lopdf`; images print as one page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfPageCounter;

impl PageCounter for PdfPageCounter {
    fn count_pages(&self, mime_type: &str, content: &[u8]) -> Result<u32, PageCountError> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/pdf" {
            let doc = lopdf::Document::load_mem(content)
                .map_err(|e| PageCountError::Parse(e.to_string()))?;
            return u32::try_from(doc.get_pages().len())
                .map_err(|e| PageCountError::Parse(e.to_string()));
        }
        if essence.starts_with("image/") {
            return Ok(1);
        }
        Err(PageCountError::Unsupported(essence))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use lopdf::{Dictionary, Document, Object, Stream};

    use super::*;

    /// Build a minimal PDF with `num_pages` blank pages.
    pub fn create_test_pdf(num_pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for _ in 0..num_pages {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set(
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 595.into(), 842.into()]),
            );
            page.set("Contents", Object::Reference(content_id));
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", i64::from(num_pages));
        pages.set("Kids", Object::Array(kids));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_counts_pdf_pages() {
        let pdf = create_test_pdf(3);
        assert_eq!(PdfPageCounter.count_pages("application/pdf", &pdf).unwrap(), 3);
    }

    #[test]
    fn test_images_are_one_page() {
        assert_eq!(PdfPageCounter.count_pages("image/png", &[0x89]).unwrap(), 1);
    }

    #[test]
    fn test_garbage_pdf_is_an_error() {
        assert!(matches!(
            PdfPageCounter.count_pages("application/pdf", b"not a pdf"),
            Err(PageCountError::Parse(_))
        ));
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        assert!(matches!(
            PdfPageCounter.count_pages("text/plain", b"hello"),
            Err(PageCountError::Unsupported(t)) if t == "text/plain"
        ));
    }
}
