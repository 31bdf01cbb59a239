//! Configuration settings for Verbatim.

use crate::error::{Result, VerbatimError};
use crate::retry::RetryPolicy;
use crate::segmentation::SegmentationConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub extraction: ExtractionSettings,
    pub segmentation: SegmentationSettings,
    pub retrieval: RetrievalSettings,
    pub concurrency: ConcurrencySettings,
    pub retry: RetrySettings,
    pub scoring: ScoringSettings,
    pub store: StoreSettings,
    pub prompts: PromptSettings,
    /// Extra or overriding theme vocabularies, keyed by guide theme category.
    pub vocabulary: HashMap<String, Vec<String>>,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level used when no `-v` flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.verbatim".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Windows embedded per request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 8,
        }
    }
}

/// Structured answer extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Chat model used for extraction.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Ask the API for a JSON object response.
    pub json_mode: bool,
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// HTTP timeout per request, in seconds.
    pub timeout_seconds: u64,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            json_mode: true,
            api_base: "https://api.openai.com/v1".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Transcript segmentation settings, in estimated tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationSettings {
    pub chunk_tokens: usize,
    pub chunk_overlap_tokens: usize,
    pub window_tokens: usize,
    pub window_step_tokens: usize,
    pub snap_radius_tokens: usize,
}

impl Default for SegmentationSettings {
    fn default() -> Self {
        let config = SegmentationConfig::default();
        Self {
            chunk_tokens: config.chunk_tokens,
            chunk_overlap_tokens: config.chunk_overlap_tokens,
            window_tokens: config.window_tokens,
            window_step_tokens: config.window_step_tokens,
            snap_radius_tokens: config.snap_radius_tokens,
        }
    }
}

impl From<&SegmentationSettings> for SegmentationConfig {
    fn from(s: &SegmentationSettings) -> Self {
        Self {
            chunk_tokens: s.chunk_tokens,
            chunk_overlap_tokens: s.chunk_overlap_tokens,
            window_tokens: s.window_tokens,
            window_step_tokens: s.window_step_tokens,
            snap_radius_tokens: s.snap_radius_tokens,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Windows kept per question per transcript.
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 8 }
    }
}

/// Concurrency limits for external calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencySettings {
    /// Concurrent embedding requests.
    pub embedding_pool: usize,
    /// Concurrent extraction requests.
    pub extraction_pool: usize,
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            embedding_pool: 2,
            extraction_pool: 6,
        }
    }
}

/// Retry/backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_delay_ms: 400,
            max_delay_ms: 8000,
            multiplier: 2.0,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(s: &RetrySettings) -> Self {
        Self {
            max_attempts: s.max_attempts,
            initial_delay: Duration::from_millis(s.initial_delay_ms),
            max_delay: Duration::from_millis(s.max_delay_ms),
            multiplier: s.multiplier,
        }
    }
}

/// Answer scoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub similarity_weight: f64,
    pub confidence_weight: f64,
    pub specificity_weight: f64,
    /// Winners scoring below this are left out of the matrix.
    pub usability_threshold: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            similarity_weight: 0.45,
            confidence_weight: 0.35,
            specificity_weight: 0.20,
            usability_threshold: 0.0,
        }
    }
}

/// Result store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path to the SQLite run database.
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.verbatim/runs.db".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<()> {
        SegmentationConfig::from(&self.segmentation).validate()?;

        if self.concurrency.embedding_pool == 0 || self.concurrency.extraction_pool == 0 {
            return Err(VerbatimError::Config(
                "pool capacities must be at least 1".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(VerbatimError::Config(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(VerbatimError::Config(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(VerbatimError::Config(
                "retry.multiplier must be a finite number >= 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| VerbatimError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("verbatim")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }

    /// Tracing filter directive for the crate: `-v` counts override the
    /// configured level.
    pub fn log_filter(&self, verbose: u8) -> String {
        let level = match verbose {
            0 => self.general.log_level.as_str(),
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        format!("verbatim={}", level)
    }

    pub fn segmentation_config(&self) -> SegmentationConfig {
        SegmentationConfig::from(&self.segmentation)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }

    /// Set a single value addressed as `section.key` (e.g. `retrieval.top_k`).
    ///
    /// The value is parsed as TOML, falling back to a plain string.
    pub fn set_value(&self, key: &str, value: &str) -> Result<Self> {
        let (section, field) = key.split_once('.').ok_or_else(|| {
            VerbatimError::Config(format!("expected 'section.key', got '{}'", key))
        })?;

        let mut root = toml::Value::try_from(self)
            .map_err(|e| VerbatimError::Config(e.to_string()))?;

        let parsed = format!("v = {}", value)
            .parse::<toml::Table>()
            .ok()
            .and_then(|mut t| t.remove("v"))
            .unwrap_or_else(|| toml::Value::String(value.to_string()));

        let table = root
            .get_mut(section)
            .and_then(|s| s.as_table_mut())
            .ok_or_else(|| VerbatimError::Config(format!("unknown section '{}'", section)))?;

        if section != "vocabulary" && !table.contains_key(field) {
            return Err(VerbatimError::Config(format!("unknown key '{}'", key)));
        }
        table.insert(field.to_string(), parsed);

        let updated: Settings = root
            .try_into()
            .map_err(|e: toml::de::Error| VerbatimError::Config(e.to_string()))?;
        updated.validate()?;
        Ok(updated)
    }
}
