//! Document sources: where transcripts and the discussion guide come from.

use crate::error::{Result, VerbatimError};
use crate::segmentation::Segmenter;
use crate::transcript::{load_guide, GuideItem, TranscriptDocument};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Supplies segmented transcripts and guide items for a run.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn transcripts(&self) -> Result<Vec<TranscriptDocument>>;

    async fn guide(&self) -> Result<Vec<GuideItem>>;

    /// Display name of the guide, recorded with the run.
    fn guide_name(&self) -> String;
}

const TRANSCRIPT_EXTENSIONS: &[&str] = &["txt", "md"];

/// Reads transcripts from a file or directory and the guide from a file.
pub struct FsDocumentSource {
    transcripts: PathBuf,
    guide: PathBuf,
    segmenter: Segmenter,
}

impl FsDocumentSource {
    pub fn new(transcripts: impl Into<PathBuf>, guide: impl Into<PathBuf>, segmenter: Segmenter) -> Self {
        Self {
            transcripts: transcripts.into(),
            guide: guide.into(),
            segmenter,
        }
    }

    async fn transcript_paths(&self) -> Result<Vec<PathBuf>> {
        let metadata = tokio::fs::metadata(&self.transcripts).await.map_err(|_| {
            VerbatimError::Source(format!(
                "{} is not a file or directory",
                self.transcripts.display()
            ))
        })?;
        if metadata.is_file() {
            return Ok(vec![self.transcripts.clone()]);
        }

        let mut entries = tokio::fs::read_dir(&self.transcripts).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_file = tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if is_file && is_transcript(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

fn is_transcript(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TRANSCRIPT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lowercase id safe for window ids: alphanumerics kept, runs of anything else become `-`.
pub fn file_id_for(label: &str) -> String {
    let mut id = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_alphanumeric() {
            id.extend(c.to_lowercase());
        } else if !id.ends_with('-') {
            id.push('-');
        }
    }
    id.trim_matches('-').to_string()
}

/// Load and segment one transcript file. The label is the file stem.
pub async fn load_transcript(path: &Path, segmenter: &Segmenter) -> Result<TranscriptDocument> {
    let label = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| VerbatimError::Source(format!("bad file name: {}", path.display())))?;
    let raw = tokio::fs::read_to_string(path).await?;

    let doc = TranscriptDocument::from_raw(&file_id_for(&label), &label, &raw, segmenter);
    debug!(label = %doc.label, chunks = doc.chunks.len(), "transcript loaded");
    Ok(doc)
}

#[async_trait]
impl DocumentSource for FsDocumentSource {
    #[instrument(skip(self), fields(path = %self.transcripts.display()))]
    async fn transcripts(&self) -> Result<Vec<TranscriptDocument>> {
        let mut seen = HashSet::new();
        let mut docs = Vec::new();

        for path in self.transcript_paths().await? {
            let doc = load_transcript(&path, &self.segmenter).await?;
            if !seen.insert(doc.label.clone()) {
                return Err(VerbatimError::Source(format!(
                    "duplicate respondent label '{}'",
                    doc.label
                )));
            }
            docs.push(doc);
        }

        info!("Loaded {} transcripts", docs.len());
        Ok(docs)
    }

    async fn guide(&self) -> Result<Vec<GuideItem>> {
        load_guide(&self.guide).await
    }

    fn guide_name(&self) -> String {
        self.guide
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.guide.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_for() {
        assert_eq!(file_id_for("Respondent 01"), "respondent-01");
        assert_eq!(file_id_for("  Dr. Ana (ICU) "), "dr-ana-icu");
    }

    #[tokio::test]
    async fn test_reads_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b-nurse.txt"), "Respondent: I work nights.").unwrap();
        std::fs::write(dir.path().join("a-surgeon.md"), "R: I operate daily.").unwrap();
        std::fs::write(dir.path().join("notes.pdf"), "ignored").unwrap();
        let guide = dir.path().join("guide.txt");
        std::fs::write(&guide, "## Warm-up\n- What is your role?\n").unwrap();

        let source = FsDocumentSource::new(dir.path(), &guide, Segmenter::default());
        let docs = source.transcripts().await.unwrap();

        let labels: Vec<&str> = docs.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["a-surgeon", "b-nurse"]);
        assert_eq!(source.guide().await.unwrap().len(), 1);
        assert_eq!(source.guide_name(), "guide.txt");
    }

    #[tokio::test]
    async fn test_duplicate_labels_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("r1.txt"), "R: one").unwrap();
        std::fs::write(dir.path().join("r1.md"), "R: two").unwrap();

        let source = FsDocumentSource::new(dir.path(), dir.path().join("g.txt"), Segmenter::default());
        assert!(source.transcripts().await.is_err());
    }

    #[tokio::test]
    async fn test_single_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Nurse 03.txt");
        tokio::fs::write(&path, "Interviewer: Your role?\nRespondent: Charge nurse.")
            .await
            .unwrap();

        let source = FsDocumentSource::new(&path, dir.path().join("g.txt"), Segmenter::default());
        let docs = source.transcripts().await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].label, "Nurse 03");
        assert_eq!(docs[0].file_id, "nurse-03");
        assert_eq!(docs[0].windows()[0].text, "Respondent: Charge nurse.");
    }

    #[tokio::test]
    async fn test_missing_path() {
        let source = FsDocumentSource::new("/definitely/not/here", "g.txt", Segmenter::default());
        assert!(source.transcripts().await.is_err());
    }
}
