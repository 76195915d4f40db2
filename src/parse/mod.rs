//! Decoders for untrusted LLM replies. Malformed replies degrade to defaults, never errors.

pub mod quiz;
pub mod summary;

pub use quiz::{parse_quiz_reply, ChoiceLetter, QuizField, QuizItem, QuizParse};
pub use summary::{enforce_bullet_format, fallback_summary, SummaryOutcome, NO_CONTENT_SUMMARY};
