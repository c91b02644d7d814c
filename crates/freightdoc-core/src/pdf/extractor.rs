//! PDF loading and per-page text extraction using lopdf and pdf-extract.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{PdfProcessor, Result};
use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// Separator appended after every page of the concatenated text.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Page tree depth after which inherited lookups give up.
const MAX_TREE_DEPTH: usize = 32;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
    config: PdfConfig,
}

/// Extracted text content of a PDF.
#[derive(Debug, Clone)]
pub struct PdfContent {
    /// Page texts in page order, each followed by a blank line.
    pub text: String,
    /// Pages with their content.
    pub pages: Vec<PdfPage>,
}

/// Content from a single PDF page.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page number (1-indexed).
    pub number: u32,
    /// Extracted text from this page.
    pub text: String,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self::with_config(&PdfConfig::default())
    }

    /// Create an extractor with the given configuration.
    pub fn with_config(config: &PdfConfig) -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
            config: config.clone(),
        }
    }

    /// The loaded document, if any.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Extract the text of every page and the concatenated document text.
    pub fn extract_all(&self) -> Result<PdfContent> {
        let page_texts = self.page_texts()?;

        let mut text = String::new();
        let mut pages = Vec::with_capacity(page_texts.len());
        for (idx, page_text) in page_texts.into_iter().enumerate() {
            text.push_str(&page_text);
            text.push_str(PAGE_SEPARATOR);
            pages.push(PdfPage {
                number: idx as u32 + 1,
                text: page_text,
            });
        }

        debug!("PDF text: {} pages, {} chars", pages.len(), text.chars().count());
        Ok(PdfContent { text, pages })
    }

    /// Page texts in page order, honoring `max_pages`.
    fn page_texts(&self) -> Result<Vec<String>> {
        if self.document.is_none() {
            return Err(PdfError::Parse("No document loaded".to_string()));
        }

        let mut pages = pdf_extract::extract_text_from_mem_by_pages(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;

        if self.config.max_pages > 0 && pages.len() > self.config.max_pages {
            trace!("Limiting text extraction to {} pages", self.config.max_pages);
            pages.truncate(self.config.max_pages);
        }
        Ok(pages)
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if !self.config.decrypt_empty_password || doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract works on bytes, so keep the decrypted serialization
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        Ok(self.extract_all()?.text)
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        if page == 0 || page > self.page_count() {
            return Err(PdfError::InvalidPage(page));
        }
        self.page_texts()?
            .into_iter()
            .nth(page as usize - 1)
            .ok_or(PdfError::InvalidPage(page))
    }
}

/// Look up `key` on a page, falling back to the closest ancestor in the
/// page tree that defines it (`Resources`, `MediaBox`).
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    node_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = node_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return doc.dereference(value).ok().map(|(_, obj)| obj);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => current = *parent_id,
            _ => return None,
        }
    }
    None
}

/// Resources dictionary for a page, handling inheritance.
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    inherited_attribute(doc, page_id, b"Resources")?.as_dict().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{pdf_with_pages, show_text};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document().is_none());
        assert_eq!(extractor.page_count(), 0);
        assert!(matches!(extractor.extract_all(), Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut extractor = PdfExtractor::new();
        let err = extractor.load(b"not a pdf").unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_pages_followed_by_separator() {
        let data = pdf_with_pages(vec![
            show_text(72, 700, 12, "First"),
            show_text(72, 700, 12, "Second"),
        ]);
        let mut extractor = PdfExtractor::new();
        extractor.load(&data).unwrap();
        assert_eq!(extractor.page_count(), 2);

        let content = extractor.extract_all().unwrap();
        assert_eq!(content.pages.len(), 2);
        assert!(content.pages[0].text.contains("First"));
        assert!(content.pages[1].text.contains("Second"));
        assert!(content.text.ends_with(PAGE_SEPARATOR));
        assert!(content.text.find("First").unwrap() < content.text.find("Second").unwrap());
    }

    #[test]
    fn test_max_pages_limits_text() {
        let data = pdf_with_pages(vec![
            show_text(72, 700, 12, "First"),
            show_text(72, 700, 12, "Second"),
        ]);
        let config = PdfConfig {
            max_pages: 1,
            ..PdfConfig::default()
        };
        let mut extractor = PdfExtractor::with_config(&config);
        extractor.load(&data).unwrap();

        let content = extractor.extract_all().unwrap();
        assert_eq!(content.pages.len(), 1);
        assert!(!content.text.contains("Second"));
    }

    #[test]
    fn test_invalid_page_number() {
        let data = pdf_with_pages(vec![show_text(72, 700, 12, "Only")]);
        let mut extractor = PdfExtractor::new();
        extractor.load(&data).unwrap();
        assert!(matches!(extractor.extract_page_text(0), Err(PdfError::InvalidPage(0))));
        assert!(matches!(extractor.extract_page_text(2), Err(PdfError::InvalidPage(2))));
    }

    #[test]
    fn test_resources_inherited_from_page_tree() {
        let data = pdf_with_pages(vec![show_text(72, 700, 12, "Only")]);
        let mut extractor = PdfExtractor::new();
        extractor.load(&data).unwrap();
        let doc = extractor.document().unwrap();
        let page_id = doc.get_pages()[&1];

        let resources = page_resources(doc, page_id).unwrap();
        assert!(resources.get(b"Font").is_ok());
        assert!(inherited_attribute(doc, page_id, b"MediaBox").is_some());
        assert!(inherited_attribute(doc, page_id, b"CropBox").is_none());
    }
}
