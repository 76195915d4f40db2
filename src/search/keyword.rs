use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use super::{ChunkingParams, IndexHandle, RetrievedChunk, SearchService};
use crate::error::{CoursemateError, Result};
use crate::ingest::chunk_text;

const K1: f32 = 1.2;
const B: f32 = 0.75;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "should", "could", "what", "which", "who", "where", "when",
    "why", "how", "this", "that", "these", "those",
];

/// Lowercased terms with stop words and single characters removed
pub fn tokenize(text: &str) -> Vec<String> {
    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| term.chars().count() >= 2)
        .map(|term| term.to_lowercase())
        .filter(|term| !stop_words.contains(term.as_str()))
        .collect()
}

/// Term statistics for one piece of material
struct KeywordIndex {
    chunks: Vec<String>,
    term_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    doc_freqs: HashMap<String, usize>,
    avg_len: f32,
}

impl KeywordIndex {
    fn build(chunks: Vec<String>) -> Self {
        let mut term_freqs = Vec::with_capacity(chunks.len());
        let mut doc_lens = Vec::with_capacity(chunks.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();

        for chunk in &chunks {
            let terms = tokenize(chunk);
            doc_lens.push(terms.len());
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for term in terms {
                *freqs.entry(term).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(freqs);
        }

        let total: usize = doc_lens.iter().sum();
        let avg_len = if doc_lens.is_empty() {
            0.0
        } else {
            total as f32 / doc_lens.len() as f32
        };

        Self {
            chunks,
            term_freqs,
            doc_lens,
            doc_freqs,
            avg_len,
        }
    }

    fn score(&self, doc: usize, query_terms: &[String]) -> f32 {
        let n = self.chunks.len() as f32;
        let len_norm = if self.avg_len > 0.0 {
            self.doc_lens[doc] as f32 / self.avg_len
        } else {
            1.0
        };

        query_terms
            .iter()
            .filter_map(|term| {
                let tf = *self.term_freqs[doc].get(term)? as f32;
                let df = *self.doc_freqs.get(term)? as f32;
                let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                Some(idf * (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * len_norm)))
            })
            .sum()
    }

    /// Chunks with a positive score, best first, ties in material order
    fn top_k(&self, question: &str, k: usize) -> Vec<(usize, f32)> {
        let mut query_terms = tokenize(question);
        query_terms.sort();
        query_terms.dedup();

        let mut scored: Vec<(usize, f32)> = (0..self.chunks.len())
            .map(|doc| (doc, self.score(doc, &query_terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
    }
}

/// Offline BM25 ranking over chunked material. Needs no embeddings service.
pub struct KeywordSearch {
    chunking: ChunkingParams,
    indexes: RwLock<HashMap<Uuid, KeywordIndex>>,
}

impl KeywordSearch {
    pub fn new(chunking: ChunkingParams) -> Self {
        Self {
            chunking,
            indexes: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SearchService for KeywordSearch {
    async fn index(&self, material: &str) -> Result<IndexHandle> {
        let chunks = chunk_text(material, self.chunking.chunk_size, self.chunking.overlap);
        if chunks.is_empty() {
            return Err(CoursemateError::Search("No text to index".to_string()));
        }

        let handle = IndexHandle::new(chunks.len());
        let index = KeywordIndex::build(chunks);
        self.indexes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.id(), index);

        log::info!("Built keyword index over {} chunks", handle.chunk_count());
        Ok(handle)
    }

    async fn query(
        &self,
        handle: &IndexHandle,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let indexes = self.indexes.read().unwrap_or_else(PoisonError::into_inner);
        let index = indexes
            .get(&handle.id())
            .ok_or_else(|| CoursemateError::Search("Unknown index handle".to_string()))?;

        Ok(index
            .top_k(question, k)
            .into_iter()
            .map(|(idx, score)| RetrievedChunk {
                text: index.chunks[idx].clone(),
                score,
            })
            .collect())
    }

    fn release(&self, handle: &IndexHandle) {
        self.indexes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.id());
    }
}
