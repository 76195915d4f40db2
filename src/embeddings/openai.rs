use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::Embedder;
use crate::cache::EmbeddingCache;
use crate::config::EmbeddingsConfig;
use crate::error::{CoursemateError, Result};

/// Upper bound on inputs per embeddings request
const MAX_BATCH_SIZE: usize = 2048;

/// Request structure for the OpenAI embeddings API
#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response structure from the OpenAI embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI-compatible embeddings client.
///
/// Splits large inputs into batches. Question embeddings go through an
/// optional LRU cache. Failures are returned to the caller as-is.
pub struct OpenAIEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    batch_size: usize,
    cache: Option<Arc<EmbeddingCache>>,
}

impl OpenAIEmbedder {
    /// Create an embedder. `batch_size` is capped at 2048.
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        batch_size: usize,
        cache: Option<Arc<EmbeddingCache>>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            cache,
        })
    }

    /// Build from the `[embeddings]` config section, with a cache sized by `cache_capacity`
    pub fn from_config(config: &EmbeddingsConfig, api_key: String) -> Result<Self> {
        let cache = (config.cache_capacity > 0)
            .then(|| Arc::new(EmbeddingCache::new(config.cache_capacity)));
        Self::new(
            api_key,
            config.base_url.clone(),
            config.model.clone(),
            config.batch_size,
            cache,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Single API request for one batch
    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| CoursemateError::Embedding(format!("Network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(CoursemateError::Embedding(format!(
                "Embeddings API error {}: {}",
                status, body
            )));
        }

        let mut result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| CoursemateError::Embedding(format!("Failed to parse response: {}", e)))?;

        if result.data.len() != texts.len() {
            return Err(CoursemateError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        result.data.sort_by_key(|d| d.index);
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let start = std::time::Instant::now();
            let embeddings = self.request_batch(batch).await?;
            log::debug!("Embedded {} texts in {:?}", batch.len(), start.elapsed());
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&self.model, text) {
                log::debug!("Cache hit for question: {}", text);
                return Ok(cached);
            }
        }

        let embedding = self
            .request_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| CoursemateError::Embedding("Empty response from embeddings API".to_string()))?;

        if let Some(cache) = &self.cache {
            cache.put(&self.model, text, embedding.clone());
        }

        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder(batch_size: usize) -> OpenAIEmbedder {
        OpenAIEmbedder::new(
            "test-key".to_string(),
            "https://api.openai.com/v1/".to_string(),
            "text-embedding-3-small".to_string(),
            batch_size,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_embedder_new() {
        let embedder = embedder(100);
        assert_eq!(embedder.model(), "text-embedding-3-small");
        assert_eq!(embedder.batch_size(), 100);
        assert_eq!(embedder.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_embedder_batch_size_bounds() {
        assert_eq!(embedder(5000).batch_size(), 2048);
        assert_eq!(embedder(0).batch_size(), 1);
    }

    #[test]
    fn test_from_config_attaches_cache() {
        let config = EmbeddingsConfig::default();
        let embedder = OpenAIEmbedder::from_config(&config, "k".to_string()).unwrap();
        assert!(embedder.cache.is_some());
    }

    #[tokio::test]
    async fn test_cached_query_skips_network() {
        let cache = Arc::new(EmbeddingCache::new(4));
        cache.put("text-embedding-3-small", "osmosis", vec![0.5, 0.5]);
        let embedder = OpenAIEmbedder::new(
            "test-key".to_string(),
            // Unroutable: any network call would fail the test
            "http://127.0.0.1:9".to_string(),
            "text-embedding-3-small".to_string(),
            10,
            Some(cache),
        )
        .unwrap();

        assert_eq!(embedder.embed_query("osmosis").await.unwrap(), vec![0.5, 0.5]);
        assert!(embedder.embed_batch(Vec::new()).await.unwrap().is_empty());
    }
}
