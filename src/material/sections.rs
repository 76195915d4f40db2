use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::markers::{find_marker_name, marker_starts, strip_markers};
use super::FileGroupedContent;

/// Sections shorter than this (after cleaning) are dropped
const MIN_SECTION_CHARS: usize = 100;

/// Names of this length or shorter are rejected
const MIN_SECTION_NAME_CHARS: usize = 3;

/// One file's cleaned text, ready for summarization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSection {
    pub file_name: String,
    pub content: String,
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"))
}

/// Strip a trailing ellipsis and collapse internal whitespace
fn clean_file_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix("...").unwrap_or(trimmed);
    whitespace_regex().replace_all(trimmed.trim(), " ").to_string()
}

fn accept_name(name: &str, seen: &HashSet<String>) -> bool {
    name.chars().count() > MIN_SECTION_NAME_CHARS
        && !name.ends_with("...")
        && !seen.contains(name)
}

/// Split the combined material at every marker (either form) into per-file sections.
///
/// Duplicate names keep their first occurrence. Sections with less than
/// 100 characters of cleaned content are dropped.
pub fn split_material_by_files(material: &str) -> Vec<FileSection> {
    let mut bounds = marker_starts(material);
    bounds.push(material.len());

    let mut seen = HashSet::new();
    let mut sections = Vec::new();

    for window in bounds.windows(2) {
        let segment = &material[window[0]..window[1]];
        if segment.trim().is_empty() {
            continue;
        }

        let Some(raw_name) = find_marker_name(segment) else {
            continue;
        };
        let file_name = clean_file_name(&raw_name);
        if !accept_name(&file_name, &seen) {
            log::debug!("Skipping section with rejected name: {:?}", file_name);
            continue;
        }

        let content = strip_markers(segment);
        if content.chars().count() <= MIN_SECTION_CHARS {
            continue;
        }

        seen.insert(file_name.clone());
        sections.push(FileSection { file_name, content });
    }

    sections
}

/// Build sections from retrieved, file-grouped chunks
pub fn sections_from_groups(groups: &FileGroupedContent) -> Vec<FileSection> {
    let mut seen = HashSet::new();
    let mut sections = Vec::new();

    for group in groups.iter() {
        let file_name = clean_file_name(&group.file_name);
        if !accept_name(&file_name, &seen) {
            continue;
        }

        let content = strip_markers(&group.chunks.join(" "));
        if content.chars().count() <= MIN_SECTION_CHARS {
            continue;
        }

        seen.insert(file_name.clone());
        sections.push(FileSection { file_name, content });
    }

    sections
}
