//! Loose JSON recovery and answer normalization.

use super::vocabulary::{ThemeVocabulary, OTHER_THEME};
use super::{ExtractedAnswer, DEFAULT_CONFIDENCE, UNSUPPORTED_CONFIDENCE_CAP};
use crate::segmentation::Window;
use crate::transcript::time_markers;
use serde_json::{Map, Value};

/// Parse model output into a JSON object.
///
/// Tries the whole text first, then the balanced `{...}` spans inside it,
/// largest first. Returns `None` when nothing parses to an object.
pub fn parse_model_json(content: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(content.trim()) {
        return Some(map);
    }

    let mut spans = balanced_spans(content);
    spans.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)));

    spans.into_iter().find_map(|(start, end)| {
        match serde_json::from_str::<Value>(&content[start..end]) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    })
}

/// Top-level balanced brace spans, ignoring braces inside JSON strings.
fn balanced_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }

    spans
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn optional_text(map: &Map<String, Value>, key: &str) -> Option<String> {
    string_field(map, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Validate raw model output into an [`ExtractedAnswer`] for `window`.
///
/// Never fails: malformed or incomplete output becomes the fallback answer.
pub fn normalize_answer(
    content: &str,
    category: &str,
    vocabulary: &ThemeVocabulary,
    window: &Window,
) -> ExtractedAnswer {
    let Some(map) = parse_model_json(content) else {
        return ExtractedAnswer::fallback(&window.id);
    };

    let (Some(quote), Some(summary), Some(theme)) = (
        string_field(&map, "quote"),
        string_field(&map, "summary"),
        string_field(&map, "theme"),
    ) else {
        return ExtractedAnswer::fallback(&window.id);
    };

    let theme = if theme.trim().eq_ignore_ascii_case(OTHER_THEME) {
        OTHER_THEME.to_string()
    } else {
        vocabulary.canonicalize(category, &theme)
    };

    let supported_by_quote = map
        .get("supported_by_quote")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut confidence = map
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);
    if !supported_by_quote {
        confidence = confidence.min(UNSUPPORTED_CONFIDENCE_CAP);
    }

    let mut time_start = optional_text(&map, "time_start");
    let mut time_end = optional_text(&map, "time_end");
    if time_start.is_none() && time_end.is_none() {
        let markers = time_markers(&window.text);
        time_start = markers.first().cloned();
        time_end = markers.last().cloned();
    }

    ExtractedAnswer {
        quote: quote.trim().to_string(),
        summary: summary.trim().to_string(),
        theme,
        supported_by_quote,
        confidence,
        speaker_label: optional_text(&map, "speaker_label"),
        time_start,
        time_end,
        window_id: window.id.clone(),
    }
}
