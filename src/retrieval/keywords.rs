//! Keyword extraction and window pre-filtering.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Minimum keyword length, in characters.
pub const MIN_KEYWORD_CHARS: usize = 3;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as",
    "at", "be", "because", "been", "before", "being", "both", "but", "by", "can", "could", "did",
    "describe", "do", "does", "doing", "during", "each", "else", "ever", "for", "from", "get",
    "had", "has", "have", "having", "her", "here", "hers", "him", "his", "how", "into", "is",
    "it", "its", "just", "kind", "like", "may", "me", "might", "more", "most", "much", "must",
    "my", "not", "now", "of", "off", "often", "on", "once", "only", "or", "other", "our", "out",
    "over", "own", "please", "same", "she", "should", "some", "such", "tell", "than", "that",
    "the", "their", "them", "then", "there", "these", "they", "thing", "things", "think", "this",
    "those", "through", "to", "too", "under", "until", "very", "was", "way", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you",
    "your", "yours",
];

static STOP_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}'-]+").expect("word pattern is valid"));

/// Significant lowercase words of `question`, deduplicated in order.
pub fn extract_keywords(question: &str) -> Vec<String> {
    let lowered = question.to_lowercase();
    let mut seen = HashSet::new();

    WORD.find_iter(&lowered)
        .map(|m| m.as_str().trim_matches(|c| c == '\'' || c == '-'))
        .filter(|w| w.chars().count() >= MIN_KEYWORD_CHARS)
        .filter(|w| !STOP_SET.contains(w))
        .filter(|w| seen.insert(w.to_string()))
        .map(str::to_string)
        .collect()
}

/// One case-insensitive whole-word pattern per keyword.
pub fn keyword_patterns(keywords: &[String]) -> Vec<Regex> {
    keywords
        .iter()
        .filter_map(|k| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(k))).ok())
        .collect()
}

/// Whether `text` contains any keyword. With no patterns every text matches.
pub fn matches_any(patterns: &[Regex], text: &str) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| p.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keywords() {
        assert_eq!(extract_keywords("What is your role?"), vec!["role"]);
        assert_eq!(
            extract_keywords("How do you manage post-operative pain, and pain relief?"),
            vec!["manage", "post-operative", "pain", "relief"]
        );
        assert_eq!(extract_keywords("Patients' views"), vec!["patients", "views"]);
    }

    #[test]
    fn test_only_stop_words_gives_no_keywords() {
        assert!(extract_keywords("What do you think about it?").is_empty());
    }

    #[test]
    fn test_whole_word_matching() {
        let patterns = keyword_patterns(&["role".to_string()]);
        assert!(matches_any(&patterns, "My ROLE is nursing."));
        assert!(!matches_any(&patterns, "Their roles changed last year."));
        assert!(matches_any(&[], "anything"));
    }
}
