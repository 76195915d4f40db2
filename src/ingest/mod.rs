pub mod chunker;
pub mod extractors;
pub mod walker;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{CoursemateError, Result};

pub use chunker::chunk_text;
pub use extractors::{extension_of, Extractor, ExtractorRegistry};
pub use walker::load_directory;

/// Characters shown in a per-file status preview
pub const PREVIEW_CHARS: usize = 500;

/// A file as received from the user, before extraction
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Extracted text of one uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDocument {
    pub name: String,
    pub raw_text: String,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_text: raw_text.into(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.raw_text.split_whitespace().count()
    }

    /// First `max_chars` characters, with "..." appended when cut
    pub fn preview(&self, max_chars: usize) -> String {
        if self.raw_text.chars().count() > max_chars {
            let head: String = self.raw_text.chars().take(max_chars).collect();
            format!("{}...", head)
        } else {
            self.raw_text.clone()
        }
    }
}

/// Reject an upload batch whose total size exceeds `max_bytes`
pub fn check_upload_size(files: &[UploadedFile], max_bytes: u64) -> Result<()> {
    let total: u64 = files.iter().map(|f| f.bytes.len() as u64).sum();
    if total > max_bytes {
        return Err(CoursemateError::InvalidInput(format!(
            "Total file size exceeds {}MB limit",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

/// SHA-256 over the names and contents of an upload batch, order-sensitive
pub fn fingerprint_uploads(files: &[UploadedFile]) -> String {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.name.as_bytes());
        hasher.update([0u8]);
        hasher.update((file.bytes.len() as u64).to_le_bytes());
        hasher.update(&file.bytes);
    }
    format!("{:x}", hasher.finalize())
}

/// Extract text from every file, skipping failures and empty results.
///
/// Files keep their upload order.
pub fn extract_documents(
    files: &[UploadedFile],
    registry: &ExtractorRegistry,
) -> Vec<SourceDocument> {
    let mut documents = Vec::with_capacity(files.len());

    for file in files {
        log::info!("Processing: {}", file.name);
        match registry.extract(&file.name, &file.bytes) {
            Ok(text) if !text.trim().is_empty() => {
                log::info!(
                    "Successfully processed: {} - {} characters",
                    file.name,
                    text.chars().count()
                );
                documents.push(SourceDocument::new(file.name.clone(), text));
            }
            Ok(_) => {
                log::warn!("Failed to extract content from: {}", file.name);
            }
            Err(e) => {
                log::warn!("Failed to extract content from: {}: {}", file.name, e);
            }
        }
    }

    documents
}
