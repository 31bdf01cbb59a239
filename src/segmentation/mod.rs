//! Transcript segmentation into overlapping chunks and retrieval windows.
//!
//! A transcript is split into large chunks (~1800 tokens) whose ends are
//! snapped to sentence or paragraph boundaries. Consecutive chunks repeat
//! ~200 tokens of context so that a statement spanning a boundary is never
//! lost. Each chunk is then split into ~400 token windows that start every
//! ~200 tokens, giving neighbouring windows a 50% overlap. Windows are the
//! unit of retrieval and extraction.

mod boundary;

use crate::error::{Result, VerbatimError};
use crate::tokenizer::{estimate_tokens, tokens_to_chars};
use boundary::{advance_chars, retreat_chars, snap_end};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A large contiguous span of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id: `{source}-c{index}`.
    pub id: String,
    /// Text content of this chunk.
    pub text: String,
    /// Byte offset of the first character in the source text.
    pub start_offset: usize,
    /// Byte offset one past the last character in the source text.
    pub end_offset: usize,
    /// Estimated token count.
    pub token_count: usize,
    /// Overlapping sub-spans of this chunk, in order.
    pub windows: Vec<Window>,
}

/// A smaller overlapping sub-span of a [`Chunk`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Deterministic id: `{chunk_id}-w{index}`.
    pub id: String,
    /// Id of the chunk this window belongs to.
    pub chunk_id: String,
    /// Text content of this window.
    pub text: String,
    /// Byte offset in the source text (not the chunk).
    pub start_offset: usize,
    /// Byte offset one past the end, in the source text.
    pub end_offset: usize,
    /// Estimated token count.
    pub token_count: usize,
}

/// Configuration for segmentation, in estimated tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationConfig {
    /// Target chunk size.
    pub chunk_tokens: usize,
    /// Context repeated at the start of the next chunk.
    pub chunk_overlap_tokens: usize,
    /// Target window size.
    pub window_tokens: usize,
    /// Distance between consecutive window starts.
    pub window_step_tokens: usize,
    /// How far from the target a boundary may be snapped.
    pub snap_radius_tokens: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            chunk_tokens: 1800,
            chunk_overlap_tokens: 200,
            window_tokens: 400,
            window_step_tokens: 200,
            snap_radius_tokens: 100,
        }
    }
}

impl SegmentationConfig {
    /// Check the invariants that guarantee progress and overlap.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_tokens == 0 || self.window_tokens == 0 || self.window_step_tokens == 0 {
            return Err(VerbatimError::Config(
                "segmentation sizes must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap_tokens >= self.chunk_tokens {
            return Err(VerbatimError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap_tokens, self.chunk_tokens
            )));
        }
        if self.window_step_tokens >= self.window_tokens {
            return Err(VerbatimError::Config(format!(
                "window step ({}) must be smaller than window size ({})",
                self.window_step_tokens, self.window_tokens
            )));
        }
        // A snapped window end must still reach past the next window start.
        if self.snap_radius_tokens >= self.window_tokens - self.window_step_tokens {
            return Err(VerbatimError::Config(format!(
                "snap radius ({}) must be smaller than window size minus step ({})",
                self.snap_radius_tokens,
                self.window_tokens - self.window_step_tokens
            )));
        }
        Ok(())
    }
}

/// Splits transcript text into chunks and windows.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    /// Create a segmenter with a validated configuration.
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Segment `text` into chunks, each carrying its windows.
    ///
    /// Pure and deterministic: identical input yields identical ids.
    /// Whitespace-only input yields no chunks.
    pub fn segment(&self, text: &str, source_id: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chunk_chars = tokens_to_chars(self.config.chunk_tokens);
        let overlap_chars = tokens_to_chars(self.config.chunk_overlap_tokens);
        let radius_chars = tokens_to_chars(self.config.snap_radius_tokens);

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = snap_end(text, start, chunk_chars, radius_chars);
            let id = format!("{}-c{}", source_id, chunks.len());
            chunks.push(self.build_chunk(text, id, start, end));

            if end >= text.len() {
                break;
            }

            let candidate = retreat_chars(text, end, overlap_chars);
            start = if candidate > start { candidate } else { end };
        }

        debug!(
            "Segmented {} ({} bytes) into {} chunks / {} windows",
            source_id,
            text.len(),
            chunks.len(),
            chunks.iter().map(|c| c.windows.len()).sum::<usize>()
        );

        chunks
    }

    fn build_chunk(&self, text: &str, id: String, start: usize, end: usize) -> Chunk {
        let chunk_text = &text[start..end];
        let windows = self.build_windows(chunk_text, &id, start);

        Chunk {
            token_count: estimate_tokens(chunk_text),
            text: chunk_text.to_string(),
            start_offset: start,
            end_offset: end,
            windows,
            id,
        }
    }

    fn build_windows(&self, chunk_text: &str, chunk_id: &str, chunk_start: usize) -> Vec<Window> {
        let window_chars = tokens_to_chars(self.config.window_tokens);
        let step_chars = tokens_to_chars(self.config.window_step_tokens);
        let radius_chars = tokens_to_chars(self.config.snap_radius_tokens);
        let len = chunk_text.len();

        let mut windows = Vec::new();
        let mut start = 0;

        loop {
            let end = snap_end(chunk_text, start, window_chars, radius_chars);
            let text = &chunk_text[start..end];

            windows.push(Window {
                id: format!("{}-w{}", chunk_id, windows.len()),
                chunk_id: chunk_id.to_string(),
                text: text.to_string(),
                start_offset: chunk_start + start,
                end_offset: chunk_start + end,
                token_count: estimate_tokens(text),
            });

            if end >= len {
                break;
            }

            let next = advance_chars(chunk_text, start, step_chars);
            if next <= start || next >= len {
                break;
            }
            start = next;
        }

        windows
    }
}

/// All windows of a set of chunks, in transcript order.
pub fn windows_of(chunks: &[Chunk]) -> Vec<&Window> {
    chunks.iter().flat_map(|c| c.windows.iter()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transcript(sentences: usize) -> String {
        (0..sentences)
            .map(|i| {
                let para = if i % 9 == 8 { "\n\n" } else { " " };
                format!("Sentence {} is about the ward.{}", i, para)
            })
            .collect()
    }

    fn small_config() -> SegmentationConfig {
        SegmentationConfig {
            chunk_tokens: 120,
            chunk_overlap_tokens: 20,
            window_tokens: 40,
            window_step_tokens: 20,
            snap_radius_tokens: 8,
        }
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let segmenter = Segmenter::default();
        assert!(segmenter.segment("", "t1").is_empty());
        assert!(segmenter.segment("   \n\n  ", "t1").is_empty());
    }

    #[test]
    fn test_short_input_is_one_chunk_one_window() {
        let segmenter = Segmenter::default();
        let chunks = segmenter.segment("I am a nurse in the ER.", "resp");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "resp-c0");
        assert_eq!(chunks[0].windows.len(), 1);
        assert_eq!(chunks[0].windows[0].id, "resp-c0-w0");
        assert_eq!(chunks[0].windows[0].text, "I am a nurse in the ER.");
    }

    #[test]
    fn test_chunks_cover_text_without_gaps() {
        let text = sample_transcript(200);
        let segmenter = Segmenter::new(small_config()).unwrap();
        let chunks = segmenter.segment(&text, "t");

        assert!(chunks.len() > 3);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks.last().unwrap().end_offset, text.len());

        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert!(next.start_offset > prev.start_offset, "no forward progress");
            assert!(next.start_offset <= prev.end_offset, "gap between chunks");
        }

        for chunk in &chunks {
            assert_eq!(chunk.text, &text[chunk.start_offset..chunk.end_offset]);
            assert!(chunk.end_offset > chunk.start_offset);
        }
    }

    #[test]
    fn test_windows_lie_within_chunk_and_overlap() {
        let text = sample_transcript(200);
        let config = small_config();
        let step_chars = tokens_to_chars(config.window_step_tokens);
        let window_chars = tokens_to_chars(config.window_tokens);
        let segmenter = Segmenter::new(config).unwrap();

        for chunk in segmenter.segment(&text, "t") {
            assert!(!chunk.windows.is_empty());
            assert_eq!(chunk.windows[0].start_offset, chunk.start_offset);
            assert_eq!(chunk.windows.last().unwrap().end_offset, chunk.end_offset);

            for window in &chunk.windows {
                assert_eq!(window.chunk_id, chunk.id);
                assert!(window.start_offset >= chunk.start_offset);
                assert!(window.end_offset <= chunk.end_offset);
                assert_eq!(window.text, &text[window.start_offset..window.end_offset]);
            }

            for pair in chunk.windows.windows(2) {
                let (prev, next) = (&pair[0], &pair[1]);
                let step = next.start_offset - prev.start_offset;
                assert!(step >= step_chars && step < window_chars);
                assert!(next.start_offset < prev.end_offset, "windows must overlap");
            }
        }
    }

    #[test]
    fn test_multibyte_text_is_sized_in_characters() {
        let text = "Мы работаем в ночную смену. ".repeat(400);
        let segmenter = Segmenter::default();
        let chunks = segmenter.segment(&text, "ru");

        assert!(chunks.len() > 1);
        let first = &chunks[0];
        assert!(
            (1750..=1850).contains(&first.token_count),
            "chunk of {} tokens",
            first.token_count
        );
        assert!(first.text.trim_end().ends_with('.'));

        let window = &first.windows[0];
        assert!(
            (375..=425).contains(&window.token_count),
            "window of {} tokens",
            window.token_count
        );

        let next = &chunks[1];
        let overlap = &text[next.start_offset..first.end_offset];
        assert_eq!(overlap.chars().count(), tokens_to_chars(200));
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let text = sample_transcript(120);
        let segmenter = Segmenter::new(small_config()).unwrap();
        assert_eq!(segmenter.segment(&text, "abc"), segmenter.segment(&text, "abc"));
    }

    #[test]
    fn test_chunk_ends_snap_to_sentences() {
        let text = sample_transcript(200);
        let segmenter = Segmenter::new(small_config()).unwrap();
        let chunks = segmenter.segment(&text, "t");

        for chunk in &chunks[..chunks.len() - 1] {
            let trimmed = chunk.text.trim_end();
            assert!(trimmed.ends_with('.'), "chunk ended mid-sentence: {:?}", trimmed);
        }
    }

    #[test]
    fn test_handles_text_without_any_boundaries() {
        let text = "x".repeat(10_000);
        let segmenter = Segmenter::new(small_config()).unwrap();
        let chunks = segmenter.segment(&text, "raw");
        assert!(chunks.len() > 1);
        assert_eq!(chunks.last().unwrap().end_offset, text.len());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = SegmentationConfig::default();
        config.window_step_tokens = config.window_tokens;
        assert!(Segmenter::new(config).is_err());

        let mut config = SegmentationConfig::default();
        config.chunk_overlap_tokens = config.chunk_tokens;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_windows_of_flattens_in_order() {
        let text = sample_transcript(200);
        let segmenter = Segmenter::new(small_config()).unwrap();
        let chunks = segmenter.segment(&text, "t");
        let windows = windows_of(&chunks);
        assert_eq!(windows.len(), chunks.iter().map(|c| c.windows.len()).sum::<usize>());
        assert_eq!(windows[0].id, "t-c0-w0");
    }
}
