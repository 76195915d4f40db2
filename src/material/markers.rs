//! File marker micro-format.
//!
//! Every document in the combined material blob is introduced by a line
//! `📚 FILE: <name>`. The older `--- FILE: <name> ---` form is still
//! recognized wherever markers are read.

use regex::Regex;
use std::sync::OnceLock;

use crate::ingest::SourceDocument;

/// Prefix of the marker line written by [`tag_documents`]
pub const FILE_MARKER_PREFIX: &str = "📚 FILE:";

/// Prefix of the legacy marker form (`--- FILE: name ---`)
pub const LEGACY_MARKER_PREFIX: &str = "--- FILE:";

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"📚 FILE:[ \t]*([^\n=]+)").expect("Invalid regex pattern"))
}

fn legacy_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"--- FILE:[ \t]*([^\n=]+?)[ \t]*---").expect("Invalid regex pattern")
    })
}

fn marker_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"📚 FILE:[^\n]*\n?|--- FILE:[^\n]*?---\n?").expect("Invalid regex pattern")
    })
}

fn blank_lines_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("Invalid regex pattern"))
}

/// Build the marker line for a file name (without trailing newline)
pub fn marker_line(file_name: &str) -> String {
    format!("{} {}", FILE_MARKER_PREFIX, file_name)
}

/// Concatenate documents into one blob, each prefixed by its marker line.
///
/// Layout per document: `📚 FILE: <name>\n<raw text>\n\n`.
pub fn tag_documents(documents: &[SourceDocument]) -> String {
    let mut combined = String::new();
    for doc in documents {
        combined.push_str(&marker_line(&doc.name));
        combined.push('\n');
        combined.push_str(&doc.raw_text);
        combined.push_str("\n\n");
    }
    combined
}

/// Name captured by the first marker found in `text`, trimmed.
///
/// The preferred form is searched before the legacy one.
pub fn find_marker_name(text: &str) -> Option<String> {
    find_marker_name_matching(text, |_| true)
}

/// Like [`find_marker_name`], but a form whose first marker name fails
/// `accept` falls through to the next form.
pub fn find_marker_name_matching<F>(text: &str, accept: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    [marker_regex(), legacy_marker_regex()]
        .iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .find(|name| !name.is_empty() && accept(name))
}

/// All distinct file names announced by markers in `text`, in order of first appearance
pub fn known_file_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in text.lines() {
        let captured = if line.contains(FILE_MARKER_PREFIX) {
            marker_regex().captures(line)
        } else if line.contains(LEGACY_MARKER_PREFIX) {
            legacy_marker_regex().captures(line)
        } else {
            None
        };

        if let Some(name) = captured
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().trim().to_string())
        {
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Remove marker lines and collapse runs of blank lines
pub fn strip_markers(text: &str) -> String {
    let without_markers = marker_line_regex().replace_all(text, "");
    blank_lines_regex()
        .replace_all(&without_markers, "\n\n")
        .trim()
        .to_string()
}

/// Split the combined blob into `(name, body)` pairs, one per preferred-form marker.
///
/// The Nth marker's name is paired with the text that follows it up to the
/// next marker. Text before the first marker is ignored.
pub fn split_on_markers(text: &str) -> Vec<(String, String)> {
    let markers: Vec<_> = marker_regex().captures_iter(text).collect();
    let mut sections = Vec::with_capacity(markers.len());

    for (idx, cap) in markers.iter().enumerate() {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        // Body begins after the rest of the marker line
        let body_start = text[whole.end()..]
            .find('\n')
            .map(|offset| whole.end() + offset + 1)
            .unwrap_or(text.len());
        let body_end = markers
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let body = if body_start <= body_end {
            &text[body_start..body_end]
        } else {
            ""
        };
        sections.push((name.as_str().trim().to_string(), body.to_string()));
    }

    sections
}

/// Byte offsets where a marker (either form) starts
pub(crate) fn marker_starts(text: &str) -> Vec<usize> {
    let mut starts: Vec<usize> = text
        .match_indices(FILE_MARKER_PREFIX)
        .chain(text.match_indices(LEGACY_MARKER_PREFIX))
        .map(|(idx, _)| idx)
        .collect();
    starts.sort_unstable();
    starts
}
