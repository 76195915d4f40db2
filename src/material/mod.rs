//! Combined course material: marker tagging, chunk attribution, per-file sections.

pub mod markers;
pub mod resolver;
pub mod sections;

use serde::Serialize;

pub use markers::{known_file_names, strip_markers, tag_documents, FILE_MARKER_PREFIX};
pub use resolver::{AttributionStrategy, Resolver, SENTINEL_FILE_NAME};
pub use sections::{sections_from_groups, split_material_by_files, FileSection};

/// Text fragments attributed to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileGroup {
    pub file_name: String,
    pub chunks: Vec<String>,
}

/// Ordered mapping from file name to its text fragments.
///
/// Iteration order is first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileGroupedContent {
    groups: Vec<FileGroup>,
}

impl FileGroupedContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragments for `file_name`, creating an empty entry if it is new
    pub fn entry(&mut self, file_name: &str) -> &mut Vec<String> {
        let idx = match self.groups.iter().position(|g| g.file_name == file_name) {
            Some(idx) => idx,
            None => {
                self.groups.push(FileGroup {
                    file_name: file_name.to_string(),
                    chunks: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[idx].chunks
    }

    pub fn push(&mut self, file_name: &str, text: impl Into<String>) {
        self.entry(file_name).push(text.into());
    }

    pub fn chunks_for(&self, file_name: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.file_name == file_name)
            .map(|g| g.chunks.as_slice())
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.file_name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// True if any file has at least one non-blank fragment
    pub fn has_content(&self) -> bool {
        self.groups
            .iter()
            .any(|g| g.chunks.iter().any(|c| !c.trim().is_empty()))
    }
}

/// Group the whole material blob by its markers.
///
/// Used when retrieval yields nothing usable. Each marker's name is paired
/// with the text that follows it; a blob without markers becomes a single
/// sentinel entry.
pub fn group_from_material(material: &str) -> FileGroupedContent {
    let mut grouped = FileGroupedContent::new();

    for (name, body) in markers::split_on_markers(material) {
        let cleaned = strip_markers(&body);
        let entry = grouped.entry(&name);
        if !cleaned.is_empty() {
            entry.push(cleaned);
        }
    }

    if grouped.is_empty() {
        let cleaned = strip_markers(material);
        if !cleaned.is_empty() {
            grouped.push(SENTINEL_FILE_NAME, cleaned);
        }
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_keeps_first_seen_order() {
        let mut grouped = FileGroupedContent::new();
        grouped.push("b.pdf", "one");
        grouped.push("a.pdf", "two");
        grouped.push("b.pdf", "three");
        assert_eq!(grouped.file_names(), vec!["b.pdf", "a.pdf"]);
        assert_eq!(
            grouped.chunks_for("b.pdf"),
            Some(&["one".to_string(), "three".to_string()][..])
        );
    }

    #[test]
    fn test_has_content() {
        let mut grouped = FileGroupedContent::new();
        grouped.entry("empty.pdf");
        assert!(!grouped.is_empty());
        assert!(!grouped.has_content());
        grouped.push("full.pdf", "text");
        assert!(grouped.has_content());
    }

    #[test]
    fn test_group_from_material_pairs_each_marker_with_its_body() {
        let material = "📚 FILE: Lecture1.pdf\nCells are small.\n\n📚 FILE: Lecture2.pdf\nAtoms are smaller.\n\n";
        let grouped = group_from_material(material);
        assert_eq!(grouped.file_names(), vec!["Lecture1.pdf", "Lecture2.pdf"]);
        assert_eq!(
            grouped.chunks_for("Lecture1.pdf"),
            Some(&["Cells are small.".to_string()][..])
        );
        assert_eq!(
            grouped.chunks_for("Lecture2.pdf"),
            Some(&["Atoms are smaller.".to_string()][..])
        );
    }

    #[test]
    fn test_group_from_material_without_markers() {
        let grouped = group_from_material("just some text");
        assert_eq!(grouped.file_names(), vec![SENTINEL_FILE_NAME]);
    }

    #[test]
    fn test_group_from_blank_material() {
        assert!(group_from_material("  \n ").is_empty());
    }
}
