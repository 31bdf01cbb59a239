//! Writes a run as pretty-printed JSON.

use super::{AnalysisRun, ResultSink};
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ResultSink for JsonFileSink {
    async fn persist(&self, run: &AnalysisRun) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(run)?;
        tokio::fs::write(&self.path, json).await?;
        info!("Wrote run {} to {:?}", run.id, self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::MatrixAssembler;
    use crate::matrix::RunCounters;

    #[tokio::test]
    async fn test_writes_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("run.json");
        let run = AnalysisRun::new(
            "guide.toml".to_string(),
            vec![],
            MatrixAssembler::new(vec![]).finish(RunCounters::default()),
        );

        JsonFileSink::new(&path).persist(&run).await.unwrap();

        let back: AnalysisRun =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, run);
    }
}
