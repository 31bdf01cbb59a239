//! Transcripts and discussion guides.
//!
//! A transcript becomes a [`TranscriptDocument`]: moderator turns are
//! filtered out and the remaining respondent text is segmented into chunks
//! and windows ready for retrieval.

pub mod guide;
pub mod speaker;

pub use guide::{load_guide, parse_guide_text, DiscussionGuide, GuideItem};
pub use speaker::filter_moderator_turns;

use crate::segmentation::{windows_of, Chunk, Segmenter, Window};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A transcript ready for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptDocument {
    /// Stable id of the source file.
    pub file_id: String,
    /// Respondent label used as the key in the result matrix.
    pub label: String,
    /// Segmented respondent text.
    pub chunks: Vec<Chunk>,
}

impl TranscriptDocument {
    /// Filter and segment a raw transcript.
    pub fn from_raw(file_id: &str, label: &str, raw_text: &str, segmenter: &Segmenter) -> Self {
        let filtered = filter_moderator_turns(raw_text);
        Self {
            file_id: file_id.to_string(),
            label: label.to_string(),
            chunks: segmenter.segment(&filtered, file_id),
        }
    }

    /// All windows of this transcript, in order.
    pub fn windows(&self) -> Vec<&Window> {
        windows_of(&self.chunks)
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

static TIME_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[((?:\d{1,2}:)?\d{1,2}:\d{2}(?:\.\d+)?)\]").expect("time marker pattern is valid")
});

/// Bracketed time markers (`[00:12:34]`, `[12:34]`) in order of appearance.
pub fn time_markers(text: &str) -> Vec<String> {
    TIME_MARKER
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}
