//! SQLite-backed run history.
//!
//! Each run is one row: summary columns for listing, plus the full result as
//! JSON.

use super::{AnalysisRun, ResultSink, RunSummary};
use crate::error::{Result, VerbatimError};
use crate::matrix::AnalysisResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    guide_name TEXT NOT NULL,
    transcript_labels TEXT NOT NULL,
    respondent_count INTEGER NOT NULL,
    question_count INTEGER NOT NULL,
    answered_question_count INTEGER NOT NULL,
    result_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_created_at ON runs(created_at);
"#;

/// SQLite run store.
pub struct SqliteRunStore {
    conn: Mutex<Connection>,
}

impl SqliteRunStore {
    /// Open (or create) the store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite run store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| VerbatimError::Store(format!("Failed to acquire lock: {}", e)))
    }

    /// Stored runs, newest first.
    pub fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, created_at, guide_name, respondent_count, question_count, answered_question_count
            FROM runs
            ORDER BY created_at DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut runs = Vec::new();
        for row in rows {
            let (id, created_at, guide_name, respondents, questions, answered) = row?;
            runs.push(RunSummary {
                id: parse_id(&id)?,
                created_at: parse_time(&created_at)?,
                guide_name,
                respondent_count: respondents as u64,
                question_count: questions as u64,
                answered_question_count: answered as u64,
            });
        }
        Ok(runs)
    }

    /// Load a full run. Accepts a unique id prefix.
    pub fn get_run(&self, id: &str) -> Result<AnalysisRun> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, created_at, guide_name, transcript_labels, result_json FROM runs WHERE id LIKE ?1 || '%' LIMIT 2",
        )?;
        let mut matches: Vec<(String, String, String, String, String)> = stmt
            .query_map(params![id], read_run_row)?
            .collect::<std::result::Result<_, _>>()?;

        if matches.len() > 1 {
            return Err(VerbatimError::InvalidInput(format!(
                "run id prefix '{}' is ambiguous",
                id
            )));
        }
        let (run_id, created_at, guide_name, labels, result_json) = matches
            .pop()
            .ok_or_else(|| VerbatimError::RunNotFound(id.to_string()))?;

        Ok(AnalysisRun {
            id: parse_id(&run_id)?,
            created_at: parse_time(&created_at)?,
            guide_name,
            transcript_labels: serde_json::from_str(&labels)?,
            result: serde_json::from_str::<AnalysisResult>(&result_json)?,
        })
    }

    /// Delete a run by exact id. Returns whether it existed.
    pub fn delete_run(&self, id: &Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM runs WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    pub fn run_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: Option<i64> = conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))
            .optional()?;
        Ok(count.unwrap_or(0) as usize)
    }
}

fn read_run_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|e| VerbatimError::Store(format!("bad run id '{}': {}", id, e)))
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| VerbatimError::Store(format!("bad timestamp '{}': {}", value, e)))
}

#[async_trait]
impl ResultSink for SqliteRunStore {
    #[instrument(skip(self, run), fields(run = %run.id))]
    async fn persist(&self, run: &AnalysisRun) -> Result<()> {
        let labels = serde_json::to_string(&run.transcript_labels)?;
        let result_json = serde_json::to_string(&run.result)?;
        let metadata = &run.result.metadata;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO runs
            (id, created_at, guide_name, transcript_labels, respondent_count, question_count,
             answered_question_count, result_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                run.id.to_string(),
                run.created_at.to_rfc3339(),
                run.guide_name,
                labels,
                metadata.total_respondent_count as i64,
                metadata.total_question_count as i64,
                metadata.answered_question_count as i64,
                result_json,
            ],
        )?;

        debug!("Stored run {}", run.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{ExtractedAnswer, ScoredAnswer};
    use crate::matrix::{MatrixAssembler, RunCounters};
    use crate::transcript::GuideItem;

    fn sample_run(guide: &str) -> AnalysisRun {
        let mut assembler = MatrixAssembler::new(vec!["R1".to_string()]);
        let mut answer = ExtractedAnswer::fallback("r1-c0-w0");
        answer.quote = "I am a nurse in the ER.".to_string();
        answer.supported_by_quote = true;
        assembler
            .push(
                &GuideItem::new("Warm-up", "What is your role?"),
                vec![(
                    "R1".to_string(),
                    ScoredAnswer {
                        answer,
                        window_id: "r1-c0-w0".to_string(),
                        chunk_id: "r1-c0".to_string(),
                        similarity: 0.8,
                        specificity: 0.2,
                        composite_score: 0.7,
                    },
                )],
            )
            .unwrap();

        AnalysisRun::new(
            guide.to_string(),
            vec!["R1".to_string()],
            assembler.finish(RunCounters {
                total_tokens: 120,
                ..RunCounters::default()
            }),
        )
    }

    #[tokio::test]
    async fn test_persist_and_get() {
        let store = SqliteRunStore::in_memory().unwrap();
        let run = sample_run("guide.toml");

        store.persist(&run).await.unwrap();

        let loaded = store.get_run(&run.id.to_string()).unwrap();
        assert_eq!(loaded.id, run.id);
        assert_eq!(loaded.result, run.result);
        assert_eq!(loaded.transcript_labels, vec!["R1"]);

        let prefix = &run.id.to_string()[..8];
        assert_eq!(store.get_run(prefix).unwrap().id, run.id);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = SqliteRunStore::in_memory().unwrap();
        let first = sample_run("a.toml");
        let second = sample_run("b.toml");
        store.persist(&first).await.unwrap();
        store.persist(&second).await.unwrap();

        let runs = store.list_runs().unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.answered_question_count == 1));
        assert_eq!(store.run_count().unwrap(), 2);

        assert!(store.delete_run(&first.id).unwrap());
        assert!(!store.delete_run(&first.id).unwrap());
        assert_eq!(store.run_count().unwrap(), 1);
    }

    #[test]
    fn test_missing_run() {
        let store = SqliteRunStore::in_memory().unwrap();
        assert!(matches!(
            store.get_run("00000000"),
            Err(VerbatimError::RunNotFound(_))
        ));
    }
}
