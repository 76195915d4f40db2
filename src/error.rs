use thiserror::Error;

/// Main error type for Coursemate
#[derive(Error, Debug)]
pub enum CoursemateError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Text extraction errors (PDF parsing, OCR)
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Embedding API errors
    #[error("Embedding API error: {0}")]
    Embedding(String),

    /// LLM completion API errors
    #[error("LLM API error: {0}")]
    Llm(String),

    /// Search/index errors
    #[error("Search error: {0}")]
    Search(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Convenient Result type using CoursemateError
pub type Result<T> = std::result::Result<T, CoursemateError>;
