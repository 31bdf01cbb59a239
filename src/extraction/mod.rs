//! Per-window answer extraction, normalization and scoring.

mod extractor;
mod parser;
mod scoring;
mod vocabulary;

pub use extractor::{Extraction, Extractor};
pub use parser::{normalize_answer, parse_model_json};
pub use scoring::{composite_score, specificity, ScoredAnswer, Scorer, ScoringWeights};
pub use vocabulary::{ThemeVocabulary, OTHER_THEME};

use serde::{Deserialize, Serialize};

/// Quote used when the model gave nothing usable.
pub const FALLBACK_QUOTE: &str = "[No direct quote found]";

/// Summary used when the model gave nothing usable.
pub const FALLBACK_SUMMARY: &str = "The respondent did not directly address this question.";

/// Confidence assigned to the fallback answer.
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

/// Confidence assumed when the model omits it.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Highest confidence allowed for an answer its quote does not support.
pub const UNSUPPORTED_CONFIDENCE_CAP: f64 = 0.5;

/// A validated answer extracted from one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedAnswer {
    pub quote: String,
    pub summary: String,
    pub theme: String,
    pub supported_by_quote: bool,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub speaker_label: Option<String>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    /// Window the answer was extracted from.
    pub window_id: String,
}

impl ExtractedAnswer {
    /// The answer recorded when the model output was malformed or incomplete.
    pub fn fallback(window_id: &str) -> Self {
        Self {
            quote: FALLBACK_QUOTE.to_string(),
            summary: FALLBACK_SUMMARY.to_string(),
            theme: OTHER_THEME.to_string(),
            supported_by_quote: false,
            confidence: FALLBACK_CONFIDENCE,
            speaker_label: None,
            time_start: None,
            time_end: None,
            window_id: window_id.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.quote == FALLBACK_QUOTE
    }
}
