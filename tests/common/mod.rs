#![allow(dead_code)]

use async_trait::async_trait;
use coursemate::error::{CoursemateError, Result};
use coursemate::llm::{CompletionClient, SamplingParams};
use coursemate::search::{IndexHandle, RetrievedChunk, SearchService};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Completion client that records prompts and returns a canned reply
pub struct FakeLlm {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<(String, SamplingParams)>>,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|(prompt, _)| prompt.clone())
            .unwrap_or_default()
    }

    pub fn last_params(&self) -> Option<SamplingParams> {
        self.prompts.lock().unwrap().last().map(|(_, params)| *params)
    }
}

#[async_trait]
impl CompletionClient for FakeLlm {
    async fn complete(&self, prompt: &str, params: SamplingParams) -> Result<String> {
        self.prompts.lock().unwrap().push((prompt.to_string(), params));
        self.reply.clone().map_err(CoursemateError::Llm)
    }
}

/// Search service returning fixed chunks for every query
pub struct FakeSearch {
    chunks: std::result::Result<Vec<String>, String>,
    pub index_calls: AtomicUsize,
    requested_k: Mutex<Vec<usize>>,
}

impl FakeSearch {
    pub fn returning(chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            chunks: Ok(chunks.iter().map(|c| c.to_string()).collect()),
            index_calls: AtomicUsize::new(0),
            requested_k: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            chunks: Err(message.to_string()),
            index_calls: AtomicUsize::new(0),
            requested_k: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SearchService for FakeSearch {
    async fn index(&self, _material: &str) -> Result<IndexHandle> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        Ok(IndexHandle::new(self.chunks.as_ref().map(Vec::len).unwrap_or(0)))
    }

    async fn query(
        &self,
        _handle: &IndexHandle,
        _question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        self.requested_k.lock().unwrap().push(k);
        match &self.chunks {
            Ok(chunks) => Ok(chunks
                .iter()
                .take(k)
                .map(|text| RetrievedChunk {
                    text: text.clone(),
                    score: 1.0,
                })
                .collect()),
            Err(message) => Err(CoursemateError::Search(message.clone())),
        }
    }
}

impl FakeSearch {
    /// `k` of the most recent query
    pub fn last_k(&self) -> Option<usize> {
        self.requested_k.lock().unwrap().last().copied()
    }
}
