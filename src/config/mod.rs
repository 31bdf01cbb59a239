//! Configuration module for Verbatim.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ExtractionPrompts, Prompts};
pub use settings::{
    ConcurrencySettings, EmbeddingSettings, ExtractionSettings, GeneralSettings, PromptSettings,
    RetrievalSettings, RetrySettings, ScoringSettings, SegmentationSettings, Settings,
    StoreSettings,
};
