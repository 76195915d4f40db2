use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use super::{ChunkingParams, IndexHandle, RetrievedChunk, SearchService};
use crate::embeddings::Embedder;
use crate::error::{CoursemateError, Result};
use crate::ingest::chunk_text;

/// Chunks and their embeddings for one piece of material
struct VectorIndex {
    chunks: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Indices and scores of the `k` most similar chunks, best first
    fn top_k(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, v)| (idx, cosine_similarity(query, v)))
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

/// In-memory vector search over embedded chunks
pub struct EmbeddingSearch {
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingParams,
    indexes: RwLock<HashMap<Uuid, VectorIndex>>,
}

impl EmbeddingSearch {
    pub fn new(embedder: Arc<dyn Embedder>, chunking: ChunkingParams) -> Self {
        Self {
            embedder,
            chunking,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    pub fn index_count(&self) -> usize {
        self.indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl SearchService for EmbeddingSearch {
    async fn index(&self, material: &str) -> Result<IndexHandle> {
        let start = std::time::Instant::now();
        let chunks = chunk_text(material, self.chunking.chunk_size, self.chunking.overlap);
        if chunks.is_empty() {
            return Err(CoursemateError::Search("No text to index".to_string()));
        }

        let vectors = self.embedder.embed_batch(chunks.clone()).await?;
        if vectors.len() != chunks.len() {
            return Err(CoursemateError::Search(format!(
                "Embedded {} of {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let handle = IndexHandle::new(chunks.len());
        self.indexes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.id(), VectorIndex { chunks, vectors });

        log::info!(
            "Indexed {} chunks in {:?}",
            handle.chunk_count(),
            start.elapsed()
        );
        Ok(handle)
    }

    async fn query(
        &self,
        handle: &IndexHandle,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let query_vector = self.embedder.embed_query(question).await?;

        let indexes = self.indexes.read().unwrap_or_else(PoisonError::into_inner);
        let index = indexes
            .get(&handle.id())
            .ok_or_else(|| CoursemateError::Search("Unknown index handle".to_string()))?;

        Ok(index
            .top_k(&query_vector, k)
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

/// Cosine similarity; 0.0 for zero-magnitude or mismatched vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
