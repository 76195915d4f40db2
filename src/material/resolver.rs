use super::markers::{find_marker_name_matching, known_file_names, strip_markers};
use super::FileGroupedContent;

/// Name used for chunks that cannot be attributed to any file
pub const SENTINEL_FILE_NAME: &str = "Course Materials";

/// Marker names of this length or shorter are treated as noise
const MIN_MARKER_NAME_CHARS: usize = 3;

/// A way of attributing a chunk of text to a source file
pub trait AttributionStrategy: Send + Sync {
    /// Returns the file name for `chunk`, or `None` to defer to the next strategy
    fn attribute(&self, chunk: &str) -> Option<String>;
}

/// Attribution by a marker embedded in the chunk itself
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerStrategy;

impl AttributionStrategy for MarkerStrategy {
    fn attribute(&self, chunk: &str) -> Option<String> {
        find_marker_name_matching(chunk, |name| name.chars().count() > MIN_MARKER_NAME_CHARS)
    }
}

/// Attribution by a case-insensitive mention of a known file name
#[derive(Debug, Clone)]
pub struct KnownFileStrategy {
    /// `(original name, lowercased name)` in precedence order
    known: Vec<(String, String)>,
}

impl KnownFileStrategy {
    pub fn new(known_files: Vec<String>) -> Self {
        let known = known_files
            .into_iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| {
                let lower = name.to_lowercase();
                (name, lower)
            })
            .collect();
        Self { known }
    }
}

impl AttributionStrategy for KnownFileStrategy {
    fn attribute(&self, chunk: &str) -> Option<String> {
        let haystack = chunk.to_lowercase();
        self.known
            .iter()
            .find(|(_, lower)| haystack.contains(lower.as_str()))
            .map(|(name, _)| name.clone())
    }
}

/// Ordered chain of attribution strategies ending in the sentinel name
pub struct Resolver {
    strategies: Vec<Box<dyn AttributionStrategy>>,
}

impl Resolver {
    /// Marker strategy first, then known file names
    pub fn new(known_files: Vec<String>) -> Self {
        Self::with_strategies(vec![
            Box::new(MarkerStrategy),
            Box::new(KnownFileStrategy::new(known_files)),
        ])
    }

    /// Resolver whose known file names come from the markers in `material`
    pub fn for_material(material: &str) -> Self {
        Self::new(known_file_names(material))
    }

    pub fn with_strategies(strategies: Vec<Box<dyn AttributionStrategy>>) -> Self {
        Self { strategies }
    }

    /// File name for a chunk, falling back to [`SENTINEL_FILE_NAME`]
    pub fn resolve(&self, chunk: &str) -> String {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.attribute(chunk))
            .unwrap_or_else(|| SENTINEL_FILE_NAME.to_string())
    }

    /// Group retrieved chunks by resolved file, cleaning each chunk of markers.
    ///
    /// A file entry is created on first sight even when its cleaned text is empty.
    pub fn group_chunks<I, S>(&self, chunks: I) -> FileGroupedContent
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut grouped = FileGroupedContent::new();
        for chunk in chunks {
            let chunk = chunk.as_ref();
            let file_name = self.resolve(chunk);
            let cleaned = strip_markers(chunk);
            let entry = grouped.entry(&file_name);
            if !cleaned.is_empty() {
                entry.push(cleaned);
            }
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_takes_precedence() {
        let resolver = Resolver::new(vec!["Other.pdf".to_string()]);
        let chunk = "📚 FILE: Lecture1.pdf\nMentions Other.pdf in passing";
        assert_eq!(resolver.resolve(chunk), "Lecture1.pdf");
    }

    #[test]
    fn test_short_marker_name_is_ignored() {
        let resolver = Resolver::new(vec!["Syllabus.pdf".to_string()]);
        let chunk = "📚 FILE: abc\nsee syllabus.pdf";
        assert_eq!(resolver.resolve(chunk), "Syllabus.pdf");
    }

    #[test]
    fn test_short_preferred_marker_falls_back_to_legacy_marker() {
        let resolver = Resolver::new(Vec::new());
        let chunk = "📚 FILE: ab\n--- FILE: Lecture2.pdf ---\ncell division";
        assert_eq!(resolver.resolve(chunk), "Lecture2.pdf");
    }

    #[test]
    fn test_tagged_chunks_resolve_to_their_marker() {
        use crate::ingest::{chunk_text, SourceDocument};
        use crate::material::markers::{marker_line, tag_documents};

        let names = ["Biology.pdf", "Chemistry.pdf", "Physics notes.png", "History.txt", "Algebra.md"];
        let documents: Vec<SourceDocument> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let body = format!("Sentence {} of {} covers a separate idea. ", i, name).repeat(12);
                SourceDocument::new(*name, body)
            })
            .collect();
        let material = tag_documents(&documents);
        let resolver = Resolver::for_material(&material);

        let mut checked = 0;
        for chunk in chunk_text(&material, 400, 60) {
            let expected = names
                .iter()
                .filter_map(|name| {
                    chunk
                        .find(&format!("{}\n", marker_line(name)))
                        .map(|pos| (pos, *name))
                })
                .min_by_key(|(pos, _)| *pos)
                .map(|(_, name)| name);
            if let Some(expected) = expected {
                assert_eq!(resolver.resolve(&chunk), expected, "chunk: {:?}", chunk);
                checked += 1;
            }
        }
        assert!(checked >= names.len() - 1);
    }

    #[test]
    fn test_known_file_is_case_insensitive() {
        let resolver = Resolver::new(vec!["Notes.PDF".to_string()]);
        assert_eq!(resolver.resolve("as shown in notes.pdf, cells divide"), "Notes.PDF");
    }

    #[test]
    fn test_known_file_precedence_follows_list_order() {
        let resolver = Resolver::new(vec!["a.pdf".to_string(), "b.pdf".to_string()]);
        assert_eq!(resolver.resolve("see b.pdf and a.pdf"), "a.pdf");
    }

    #[test]
    fn test_unattributed_chunk_gets_sentinel() {
        let resolver = Resolver::new(Vec::new());
        assert_eq!(resolver.resolve("plain text"), SENTINEL_FILE_NAME);
    }

    #[test]
    fn test_group_chunks_creates_entry_for_marker_only_chunk() {
        let resolver = Resolver::new(Vec::new());
        let grouped = resolver.group_chunks(["📚 FILE: Lecture1.pdf\n", "stray text"]);
        assert_eq!(grouped.file_names(), vec!["Lecture1.pdf", SENTINEL_FILE_NAME]);
        assert!(grouped.chunks_for("Lecture1.pdf").unwrap_or_default().is_empty());
        assert_eq!(grouped.chunks_for(SENTINEL_FILE_NAME), Some(&["stray text".to_string()][..]));
    }

    #[test]
    fn test_custom_strategy_chain() {
        struct Fixed;
        impl AttributionStrategy for Fixed {
            fn attribute(&self, _chunk: &str) -> Option<String> {
                Some("fixed.pdf".to_string())
            }
        }
        let resolver = Resolver::with_strategies(vec![Box::new(Fixed)]);
        assert_eq!(resolver.resolve("anything"), "fixed.pdf");
    }
}
