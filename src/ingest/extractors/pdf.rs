use super::Extractor;
use crate::error::{CoursemateError, Result};

/// PDF text extraction backed by `pdf-extract`.
///
/// Text is extracted page by page. Each non-empty page is emitted as
/// `Page <n>:\n<text>\n\n`, numbered from 1 over all pages.
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn can_extract(&self, extension: &str) -> bool {
        extension == "pdf"
    }

    fn extract(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| {
            CoursemateError::Extraction(format!("Error reading PDF {}: {}", name, e))
        })?;
        Ok(format_pages(&pages))
    }
}

/// Lay out extracted page texts, skipping blank pages but keeping their numbers
pub fn format_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let mut out = String::new();
    for (idx, page) in pages.iter().enumerate() {
        let page = page.as_ref().trim();
        if page.is_empty() {
            continue;
        }
        out.push_str(&format!("Page {}:\n{}\n\n", idx + 1, page));
    }
    out
}
