use std::fs;
use std::process::Command;

use super::Extractor;
use crate::error::{CoursemateError, Result};

/// Image OCR through the `tesseract` command line tool
#[derive(Debug, Clone)]
pub struct OcrExtractor {
    binary: String,
    language: String,
}

impl Default for OcrExtractor {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: "eng".to_string(),
        }
    }
}

impl OcrExtractor {
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    /// Check if the OCR binary can be executed
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Extractor for OcrExtractor {
    fn can_extract(&self, extension: &str) -> bool {
        matches!(extension, "png" | "jpg" | "jpeg")
    }

    fn extract(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let temp_dir = std::env::temp_dir().join(format!("coursemate-ocr-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&temp_dir)?;

        let extension = super::extension_of(name);
        let input_path = temp_dir.join(format!("input.{}", extension));
        let result = fs::write(&input_path, bytes)
            .map_err(CoursemateError::Io)
            .and_then(|_| {
                Command::new(&self.binary)
                    .arg(&input_path)
                    .arg("stdout")
                    .arg("-l")
                    .arg(&self.language)
                    .output()
                    .map_err(|e| {
                        CoursemateError::Extraction(format!(
                            "Failed to run {} for {}: {}",
                            self.binary, name, e
                        ))
                    })
            });

        if let Err(e) = fs::remove_dir_all(&temp_dir) {
            log::debug!("Failed to clean up {}: {}", temp_dir.display(), e);
        }

        let output = result?;
        if !output.status.success() {
            return Err(CoursemateError::Extraction(format!(
                "OCR failed for {}: {}",
                name,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_extract_images_only() {
        let ocr = OcrExtractor::default();
        assert!(ocr.can_extract("png"));
        assert!(ocr.can_extract("jpeg"));
        assert!(!ocr.can_extract("pdf"));
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        let ocr = OcrExtractor::new("coursemate-no-such-ocr-binary", "eng");
        assert!(!ocr.is_available());
        let err = ocr.extract("scan.png", b"\x89PNG").unwrap_err();
        assert!(matches!(err, CoursemateError::Extraction(_)));
    }
}
