use regex::Regex;
use std::sync::OnceLock;

use crate::material::FileSection;

/// Returned when there is nothing to summarize
pub const NO_CONTENT_SUMMARY: &str = "• No content found in the uploaded materials.";

const MAX_FALLBACK_BULLETS: usize = 6;
const MIN_SENTENCE_CHARS: usize = 20;
const MAX_SENTENCE_CHARS: usize = 150;
const SKIPPED_SENTENCE_WORDS: [&str; 4] = ["example", "note:", "figure", "table"];
const BOILERPLATE_PREFIXES: [&str; 9] = ["1.", "2.", "3.", "4.", "5.", "6.", "-", "EXAMPLE", "RULES:"];

/// How the final summary text was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// The reply already had headers and bullets; stray lines were bulleted
    Enforced(String),
    /// The reply was unusable; the summary was built from the sections
    Regenerated(String),
}

impl SummaryOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Enforced(text) | Self::Regenerated(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Enforced(text) | Self::Regenerated(text) => text,
        }
    }
}

fn sentence_split_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("Invalid regex pattern"))
}

/// Force a summary reply into `📘` headers and `•` bullets.
///
/// A reply with at least one header and one bullet is cleaned line by line;
/// anything else is replaced by [`fallback_summary`].
pub fn enforce_bullet_format(reply: &str, sections: &[FileSection]) -> SummaryOutcome {
    let has_bullets = reply.contains('•');
    let has_headers = reply.contains('📘');

    if reply.trim().is_empty() || !has_bullets || !has_headers {
        log::warn!("Summary reply not in bullet format, regenerating locally");
        return SummaryOutcome::Regenerated(fallback_summary(sections));
    }

    let cleaned: Vec<String> = reply
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            if line.starts_with('📘') || line.starts_with('•') {
                Some(line.to_string())
            } else if !line.is_empty()
                && !BOILERPLATE_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
            {
                Some(format!("• {}", line))
            } else {
                None
            }
        })
        .collect();

    SummaryOutcome::Enforced(cleaned.join("\n"))
}

/// Key sentences of a section: 20 < length < 150, no example/note/figure/table text
pub fn key_sentences(content: &str) -> Vec<String> {
    sentence_split_regex()
        .split(content)
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| {
            let len = s.chars().count();
            len > MIN_SENTENCE_CHARS && len < MAX_SENTENCE_CHARS
        })
        .filter(|s| {
            let lower = s.to_lowercase();
            !SKIPPED_SENTENCE_WORDS.iter().any(|w| lower.contains(w))
        })
        .take(MAX_FALLBACK_BULLETS)
        .collect()
}

/// Deterministic local summary: a `📘` header and up to six bullets per section
pub fn fallback_summary(sections: &[FileSection]) -> String {
    if sections.is_empty() {
        return NO_CONTENT_SUMMARY.to_string();
    }

    let mut lines = Vec::new();
    for section in sections {
        lines.push(format!("📘 {}", section.file_name));
        for sentence in key_sentences(&section.content) {
            lines.push(format!("• {}", sentence));
        }
        lines.push(String::new());
    }

    lines.join("\n").trim().to_string()
}
