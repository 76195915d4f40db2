use super::Extractor;
use crate::error::Result;

/// Plain text and markdown notes, decoded lossily as UTF-8
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn can_extract(&self, extension: &str) -> bool {
        matches!(extension, "txt" | "md")
    }

    fn extract(&self, _name: &str, bytes: &[u8]) -> Result<String> {
        Ok(String::from_utf8_lossy(bytes).trim().to_string())
    }
}
