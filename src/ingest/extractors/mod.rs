pub mod ocr;
pub mod pdf;
pub mod plaintext;

use std::panic::{self, AssertUnwindSafe};

use crate::error::{CoursemateError, Result};

/// Turns the bytes of one uploaded file into plain text
pub trait Extractor: Send + Sync {
    /// Check if this extractor can handle the given (lowercased) file extension
    fn can_extract(&self, extension: &str) -> bool;

    /// Extract text from file content. `name` is used for log messages only.
    fn extract(&self, name: &str, bytes: &[u8]) -> Result<String>;
}

/// Extractor registry that selects the appropriate extractor by extension
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Create a registry with PDF, image OCR and plain text extractors
    pub fn new() -> Self {
        let mut registry = Self {
            extractors: Vec::new(),
        };

        registry.register(Box::new(pdf::PdfExtractor));
        registry.register(Box::new(ocr::OcrExtractor::default()));
        registry.register(Box::new(plaintext::PlainTextExtractor));

        registry
    }

    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.push(extractor);
    }

    pub fn find_extractor(&self, extension: &str) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.can_extract(extension))
            .map(|e| e.as_ref())
    }

    pub fn supports(&self, file_name: &str) -> bool {
        self.find_extractor(&extension_of(file_name)).is_some()
    }

    /// Extract text from a named file using the extractor for its extension.
    ///
    /// A panicking extractor is reported as an extraction error for that file.
    pub fn extract(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let extension = extension_of(name);
        let extractor = self.find_extractor(&extension).ok_or_else(|| {
            CoursemateError::Extraction(format!("Unsupported file type: {}", name))
        })?;

        panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(name, bytes))).unwrap_or_else(
            |payload| {
                Err(CoursemateError::Extraction(format!(
                    "Extractor crashed on {}: {}",
                    name,
                    panic_message(payload.as_ref())
                )))
            },
        )
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercased extension of a file name, empty if it has none
pub fn extension_of(name: &str) -> String {
    std::path::Path::new(name)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}
