pub mod keyword;
pub mod vector;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;

pub use keyword::KeywordSearch;
pub use vector::EmbeddingSearch;

/// A chunk returned for a question, highest score first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub score: f32,
}

/// Opaque reference to material indexed by a [`SearchService`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexHandle {
    id: Uuid,
    chunk_count: usize,
}

impl IndexHandle {
    pub fn new(chunk_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            chunk_count,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }
}

/// Chunking parameters shared by the search backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingParams {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 150,
        }
    }
}

/// Similarity search over the loaded material.
///
/// Implementations chunk and index the material text once, then answer
/// top-k queries against the returned handle.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn index(&self, material: &str) -> Result<IndexHandle>;

    async fn query(
        &self,
        handle: &IndexHandle,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>>;

    /// Forget an index that is no longer referenced
    fn release(&self, _handle: &IndexHandle) {}
}
