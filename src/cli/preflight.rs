//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, VerbatimError};
use std::path::Path;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Analysis calls both the embedding and chat APIs.
    Analyze,
    /// Retrieval calls the embedding API.
    Retrieve,
    /// Segmentation is local only.
    Segment,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Analyze | Operation::Retrieve => check_api_key(),
        Operation::Segment => Ok(()),
    }
}

/// Check that analysis inputs exist before any API call is made.
pub fn check_inputs(guide: &Path, transcripts: &Path) -> Result<()> {
    if !guide.is_file() {
        return Err(VerbatimError::InvalidInput(format!(
            "guide file not found: {}",
            guide.display()
        )));
    }
    if !transcripts.exists() {
        return Err(VerbatimError::InvalidInput(format!(
            "transcripts not found: {}",
            transcripts.display()
        )));
    }
    Ok(())
}

/// Check that the extraction endpoint looks usable.
pub fn check_settings(settings: &Settings) -> Result<()> {
    let base = &settings.extraction.api_base;
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(VerbatimError::Config(format!(
            "extraction.api_base must be an http(s) URL, got '{}'",
            base
        )));
    }
    settings.validate()
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(VerbatimError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(VerbatimError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_segment_no_requirements() {
        assert!(check(Operation::Segment).is_ok());
    }

    #[test]
    fn test_check_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let guide = dir.path().join("guide.toml");
        std::fs::write(&guide, "").unwrap();

        assert!(check_inputs(&guide, dir.path()).is_ok());
        assert!(check_inputs(&dir.path().join("missing.toml"), dir.path()).is_err());
        assert!(check_inputs(&guide, &dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_check_settings_rejects_bad_base() {
        let mut settings = Settings::default();
        assert!(check_settings(&settings).is_ok());
        settings.extraction.api_base = "api.openai.com".to_string();
        assert!(check_settings(&settings).is_err());
    }
}
