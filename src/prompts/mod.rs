//! Prompt builders. Pure string assembly; no I/O.

pub mod quiz;
pub mod rag;
pub mod summary;

pub use quiz::{build_quiz_prompt, condense_material};
pub use rag::build_rag_prompt;
pub use summary::build_summary_prompt;

/// Keep the first `keep` characters plus "..." when `text` exceeds `limit` characters
pub(crate) fn clip(text: &str, limit: usize, keep: usize) -> String {
    if text.chars().count() > limit {
        let head: String = text.chars().take(keep).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip() {
        assert_eq!(clip("short", 10, 3), "short");
        assert_eq!(clip("0123456789AB", 10, 3), "012...");
        assert_eq!(clip("ééééé", 4, 2), "éé...");
    }
}
