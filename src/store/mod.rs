//! Result sinks for finished analysis runs.

mod json;
mod sqlite;

pub use json::JsonFileSink;
pub use sqlite::SqliteRunStore;

use crate::error::Result;
use crate::matrix::AnalysisResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A finished run, as handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub guide_name: String,
    pub transcript_labels: Vec<String>,
    pub result: AnalysisResult,
}

impl AnalysisRun {
    pub fn new(guide_name: String, transcript_labels: Vec<String>, result: AnalysisResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            guide_name,
            transcript_labels,
            result,
        }
    }
}

/// Summary row for listing stored runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub guide_name: String,
    pub respondent_count: u64,
    pub question_count: u64,
    pub answered_question_count: u64,
}

/// Receives the final structured result of a run.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(&self, run: &AnalysisRun) -> Result<()>;
}
