//! Character-length token estimation.
//!
//! Only used to size chunks and windows; no model tokenizer is involved.

/// Characters per token assumed by the estimator.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of a piece of text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Convert a token budget into an approximate character budget.
pub fn tokens_to_chars(tokens: usize) -> usize {
    tokens * CHARS_PER_TOKEN
}
