//! Verbatim - quote extraction for interview research
//!
//! Reads long-form interview transcripts and, for every question in a
//! discussion guide, finds the best-supported verbatim quote, summary and
//! theme for each respondent.
//!
//! # Overview
//!
//! For each guide question, Verbatim:
//! - drops moderator turns and segments each transcript into chunks and
//!   overlapping windows
//! - keeps windows that mention the question's keywords and ranks them by
//!   embedding similarity
//! - asks a chat model to extract a structured answer from every retrieved
//!   window, under bounded concurrency with retry and backoff
//! - scores the answers and keeps one winner per respondent
//!
//! # Architecture
//!
//! - `config` - Configuration management and prompt templates
//! - `tokenizer` - Token estimates from character counts
//! - `transcript` - Speaker filtering, guide parsing, transcript documents
//! - `segmentation` - Chunks and windows
//! - `pool` - Bounded task pool
//! - `retry` - Retry with backoff and rate-limit handling
//! - `embedding` - Embedding generation
//! - `completion` - Structured chat completions
//! - `retrieval` - Keyword pre-filter and similarity ranking
//! - `extraction` - Answer parsing, normalization and scoring
//! - `matrix` - Result matrix assembly
//! - `source` / `store` - Inputs and result sinks
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use verbatim::config::Settings;
//! use verbatim::orchestrator::Orchestrator;
//! use verbatim::source::FsDocumentSource;
//! use verbatim::store::SqliteRunStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let store = SqliteRunStore::new(&settings.sqlite_path())?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let source = FsDocumentSource::new(
//!         "interviews/",
//!         "guide.toml",
//!         orchestrator.segmenter().clone(),
//!     );
//!     let run = orchestrator.run(&source, &[&store]).await?;
//!     println!(
//!         "Answered {} of {} questions",
//!         run.result.metadata.answered_question_count,
//!         run.result.metadata.total_question_count
//!     );
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod matrix;
pub mod openai;
pub mod orchestrator;
pub mod pool;
pub mod retrieval;
pub mod retry;
pub mod segmentation;
pub mod source;
pub mod store;
pub mod tokenizer;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use error::{Result, VerbatimError};
