//! In-memory test doubles for the external capabilities.

use crate::completion::{Completion, CompletionOptions, StructuredCompleter, TokenUsage};
use crate::embedding::Embedder;
use crate::retry::{CallError, CallResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type EmbedFn = dyn Fn(&str) -> CallResult<Vec<f32>> + Send + Sync;
type CompleteFn = dyn Fn(&str) -> CallResult<String> + Send + Sync;

/// Embeds each text with a closure and counts requests.
pub struct FnEmbedder {
    embed_text: Box<EmbedFn>,
    dimensions: usize,
    requests: AtomicUsize,
}

impl FnEmbedder {
    pub fn new(
        dimensions: usize,
        embed_text: impl Fn(&str) -> CallResult<Vec<f32>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            embed_text: Box::new(embed_text),
            dimensions,
            requests: AtomicUsize::new(0),
        }
    }

    /// Number of `embed`/`embed_batch` requests made.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FnEmbedder {
    async fn embed(&self, text: &str) -> CallResult<Vec<f32>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        (self.embed_text)(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> CallResult<Vec<Vec<f32>>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1)).await;
        texts.iter().map(|t| (self.embed_text)(t)).collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Answers every prompt with a closure over the user message.
pub struct FnCompleter {
    respond: Box<CompleteFn>,
    tokens_per_call: u64,
    calls: AtomicUsize,
}

impl FnCompleter {
    pub fn new(respond: impl Fn(&str) -> CallResult<String> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            tokens_per_call: 100,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always return `content`.
    pub fn fixed(content: &str) -> Self {
        let content = content.to_string();
        Self::new(move |_| Ok(content.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StructuredCompleter for FnCompleter {
    async fn complete_structured(
        &self,
        _system: &str,
        user: &str,
        _options: &CompletionOptions,
    ) -> CallResult<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1)).await;
        let content = (self.respond)(user)?;
        Ok(Completion {
            content,
            usage: TokenUsage {
                prompt_tokens: self.tokens_per_call - 20,
                completion_tokens: 20,
                total_tokens: self.tokens_per_call,
            },
        })
    }

    fn model(&self) -> &str {
        "test-model"
    }
}

/// A rate-limit error without a retry hint.
pub fn rate_limited() -> CallError {
    CallError::RateLimited {
        retry_after: None,
        message: "429 Too Many Requests".to_string(),
    }
}
