//! Boundary snapping for chunk and window ends.
//!
//! Sizes are measured in characters; every returned value is a byte offset
//! into the `str` that lies on a UTF-8 character boundary.

/// Byte offset reached by walking `chars` characters forward from `from`.
/// Clamped to the end of the text.
pub(crate) fn advance_chars(text: &str, from: usize, chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(rel, _)| from + rel)
}

/// Byte offset reached by walking `chars` characters back from `from`.
/// Clamped to the start of the text.
pub(crate) fn retreat_chars(text: &str, from: usize, chars: usize) -> usize {
    if chars == 0 {
        return from;
    }
    text[..from]
        .char_indices()
        .rev()
        .nth(chars - 1)
        .map_or(0, |(pos, _)| pos)
}

/// Pick the end offset for a span that starts at byte `start` and aims for
/// `target` characters.
///
/// Preference order inside `target ± radius` characters:
/// 1. the sentence terminator (`.`, `!`, `?` followed by whitespace) nearest the target,
/// 2. the paragraph break nearest the target,
/// 3. the raw target offset.
///
/// The result is always strictly greater than `start` (unless `start` is
/// already at the end of the text) and never exceeds `text.len()`.
pub(crate) fn snap_end(text: &str, start: usize, target: usize, radius: usize) -> usize {
    let len = text.len();
    let raw = advance_chars(text, start, target);
    if raw >= len {
        return len;
    }

    let lo = retreat_chars(text, raw, radius).max(advance_chars(text, start, 1));
    let hi = advance_chars(text, raw, radius);

    if lo < hi {
        if let Some(end) = nearest(sentence_ends(text, lo, hi), raw) {
            return end;
        }
        if let Some(end) = nearest(paragraph_ends(text, lo, hi), raw) {
            return end;
        }
    }

    if raw > start {
        raw
    } else {
        advance_chars(text, start, 1)
    }
}

/// Offsets just past each sentence terminator found in `text[lo..hi]`.
fn sentence_ends(text: &str, lo: usize, hi: usize) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut chars = text[lo..].char_indices().peekable();

    while let Some((rel, c)) = chars.next() {
        let pos = lo + rel;
        if pos >= hi {
            break;
        }
        if matches!(c, '.' | '!' | '?') {
            let followed_by_space = match chars.peek() {
                Some((_, next)) => next.is_whitespace(),
                None => true,
            };
            if followed_by_space {
                ends.push(pos + 1);
            }
        }
    }

    ends
}

/// Offsets just past each blank-line paragraph break found in `text[lo..hi]`.
fn paragraph_ends(text: &str, lo: usize, hi: usize) -> Vec<usize> {
    text[lo..hi]
        .match_indices("\n\n")
        .map(|(rel, sep)| lo + rel + sep.len())
        .collect()
}

fn nearest(candidates: Vec<usize>, target: usize) -> Option<usize> {
    candidates
        .into_iter()
        .min_by_key(|&pos| pos.abs_diff(target))
}
