pub mod openai;

use async_trait::async_trait;

use crate::error::Result;

pub use openai::OpenAIEmbedder;

/// Source of embedding vectors for chunks and questions
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed many texts, one vector per input, in input order
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Embed a single question. Implementations may cache.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}
