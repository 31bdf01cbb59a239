//! Window retrieval for guide questions.
//!
//! Windows are first pre-filtered by the question's keywords, then ranked by
//! cosine similarity between the question embedding and each candidate
//! window embedding. The top `top_k` hits are returned, best first.

mod keywords;

pub use keywords::{extract_keywords, keyword_patterns, matches_any};

use crate::embedding::Embedder;
use crate::error::{Result, VerbatimError};
use crate::pool::TaskPool;
use crate::retry::{CallStats, RetryCaller};
use crate::segmentation::Window;
use futures::future::join_all;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

/// Default number of hits kept per question per transcript.
pub const DEFAULT_TOP_K: usize = 8;

/// Default number of windows per embedding request.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// A window ranked against a question.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalHit {
    pub window: Window,
    pub similarity: f32,
}

/// Counters for one retrieval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetrievalStats {
    pub windows: usize,
    pub candidates: usize,
    pub embedding_requests: u32,
    pub degraded_batches: u32,
    pub retries: u32,
    pub rate_limit_hits: u32,
}

impl RetrievalStats {
    fn absorb(&mut self, call: CallStats) {
        self.embedding_requests += call.attempts;
        self.retries += call.retries;
        self.rate_limit_hits += call.rate_limit_hits;
    }
}

/// Ranked hits for one (question, transcript) pair.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    pub hits: Vec<RetrievalHit>,
    pub stats: RetrievalStats,
}

/// A question with its keywords and a lazily computed embedding.
///
/// The embedding is requested at most once, the first time a transcript
/// has keyword candidates, and then shared by every later transcript.
#[derive(Debug)]
pub struct PreparedQuestion {
    question: String,
    keywords: Vec<String>,
    patterns: Vec<Regex>,
    embedding: OnceCell<Vec<f32>>,
}

impl PreparedQuestion {
    pub fn new(question: &str) -> Self {
        let keywords = extract_keywords(question);
        let patterns = keyword_patterns(&keywords);
        Self {
            question: question.to_string(),
            keywords,
            patterns,
            embedding: OnceCell::new(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Whether the question embedding has been requested successfully.
    pub fn is_embedded(&self) -> bool {
        self.embedding.initialized()
    }
}

/// Ranks transcript windows against guide questions.
pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    pool: Arc<TaskPool>,
    retry: RetryCaller,
    top_k: usize,
    batch_size: usize,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn Embedder>, pool: Arc<TaskPool>, retry: RetryCaller) -> Self {
        Self {
            embedder,
            pool,
            retry,
            top_k: DEFAULT_TOP_K,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn prepare(&self, question: &str) -> PreparedQuestion {
        PreparedQuestion::new(question)
    }

    /// Prepare `question` and retrieve in one step.
    pub async fn find_relevant_windows_for(
        &self,
        question: &str,
        windows: &[&Window],
    ) -> Result<Retrieval> {
        let prepared = self.prepare(question);
        self.find_relevant_windows(&prepared, windows).await
    }

    /// Rank `windows` against a prepared question.
    ///
    /// Fails only if the question itself cannot be embedded. Window batches
    /// that exhaust their retries score zero.
    #[instrument(skip_all, fields(windows = windows.len()))]
    pub async fn find_relevant_windows(
        &self,
        prepared: &PreparedQuestion,
        windows: &[&Window],
    ) -> Result<Retrieval> {
        let mut stats = RetrievalStats {
            windows: windows.len(),
            ..RetrievalStats::default()
        };

        let candidates: Vec<&Window> = windows
            .iter()
            .copied()
            .filter(|w| matches_any(&prepared.patterns, &w.text))
            .collect();
        stats.candidates = candidates.len();

        if candidates.is_empty() {
            debug!(keywords = ?prepared.keywords, "no keyword candidates");
            return Ok(Retrieval {
                hits: Vec::new(),
                stats,
            });
        }

        let question_embedding = self.question_embedding(prepared, &mut stats).await?;
        let window_embeddings = self.embed_windows(&candidates, &mut stats).await?;

        let mut hits: Vec<RetrievalHit> = candidates
            .into_iter()
            .zip(window_embeddings)
            .map(|(window, embedding)| RetrievalHit {
                window: window.clone(),
                similarity: cosine_similarity(question_embedding, &embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        hits.truncate(self.top_k);

        debug!(
            candidates = stats.candidates,
            hits = hits.len(),
            best = hits.first().map(|h| h.similarity),
            "retrieval complete"
        );

        Ok(Retrieval { hits, stats })
    }

    async fn question_embedding<'q>(
        &self,
        prepared: &'q PreparedQuestion,
        stats: &mut RetrievalStats,
    ) -> Result<&'q Vec<f32>> {
        let mut call_stats = None;

        let embedding = prepared
            .embedding
            .get_or_try_init(|| async {
                let attempted = self
                    .pool
                    .submit(|| {
                        self.retry
                            .call("embed question", || self.embedder.embed(&prepared.question))
                    })
                    .await?
                    .map_err(|failure| VerbatimError::exhausted("embed question", failure))?;
                call_stats = Some(attempted.stats);
                Ok::<_, VerbatimError>(attempted.value)
            })
            .await?;

        if let Some(call) = call_stats {
            stats.absorb(call);
        }
        Ok(embedding)
    }

    async fn embed_windows(
        &self,
        windows: &[&Window],
        stats: &mut RetrievalStats,
    ) -> Result<Vec<Vec<f32>>> {
        let batches: Vec<Vec<String>> = windows
            .chunks(self.batch_size)
            .map(|batch| batch.iter().map(|w| w.text.clone()).collect())
            .collect();

        let outcomes = join_all(batches.iter().map(|texts| {
            self.pool.submit(move || {
                self.retry
                    .call("embed windows", move || self.embedder.embed_batch(texts))
            })
        }))
        .await;

        let dims = self.embedder.dimensions();
        let mut embeddings = Vec::with_capacity(windows.len());

        for (texts, outcome) in batches.iter().zip(outcomes) {
            match outcome? {
                Ok(attempted) => {
                    stats.absorb(attempted.stats);
                    let mut vectors = attempted.value;
                    vectors.resize(texts.len(), vec![0.0; dims]);
                    embeddings.extend(vectors);
                }
                Err(failure) => {
                    stats.absorb(failure.stats);
                    stats.degraded_batches += 1;
                    warn!(
                        batch = texts.len(),
                        error = %failure,
                        "window batch embedding failed, scoring as zero"
                    );
                    embeddings.extend(std::iter::repeat(vec![0.0; dims]).take(texts.len()));
                }
            }
        }

        Ok(embeddings)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0 for empty or mismatched vectors and for zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
