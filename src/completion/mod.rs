//! Structured (JSON) chat completions used for answer extraction.

mod openai;

pub use openai::{parse_retry_after, OpenAIChatCompleter};

use crate::retry::CallResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request options for a single completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    /// Ask for a JSON object response.
    pub json_mode: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            json_mode: true,
        }
    }
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Raw model output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

/// A chat model that returns (ideally) a JSON object.
#[async_trait]
pub trait StructuredCompleter: Send + Sync {
    async fn complete_structured(
        &self,
        system: &str,
        user: &str,
        options: &CompletionOptions,
    ) -> CallResult<Completion>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
