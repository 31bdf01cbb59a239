//! Embedding generation for window retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::retry::CallResult;
use async_trait::async_trait;

/// Trait for embedding generation.
///
/// Failures are classified so the retry caller can tell rate limits from
/// transient and fatal errors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> CallResult<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> CallResult<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}
