pub mod chat;

use async_trait::async_trait;

use crate::error::Result;

pub use chat::ChatCompletionClient;

/// Sampling settings for one completion call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SamplingParams {
    /// Grounded question answering
    pub const RAG: Self = Self {
        temperature: 0.3,
        max_tokens: 2500,
    };

    /// Per-file bullet summaries
    pub const SUMMARY: Self = Self {
        temperature: 0.3,
        max_tokens: 1500,
    };

    /// One multiple-choice question
    pub const QUIZ: Self = Self {
        temperature: 0.7,
        max_tokens: 500,
    };
}

/// Text completion service: one user prompt in, one reply out
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, params: SamplingParams) -> Result<String>;
}
