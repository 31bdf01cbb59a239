//! Answer scoring and best-answer selection.

use super::ExtractedAnswer;
use crate::retrieval::RetrievalHit;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("digit pattern is valid"));

static ROLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(nurse|doctor|physician|surgeon|anesthesiologist|anaesthetist|pharmacist|therapist|physiotherapist|clinician|practitioner|specialist|consultant|resident|midwife|technician|manager|director|coordinator)s?\b",
    )
    .expect("role pattern is valid")
});

static TIME_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(day|week|month|year|hour|minute)s?\b").expect("time unit pattern is valid")
});

static PRODUCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(medications?|medicines?|drugs?|treatments?|therapy|therapies|opioids?|morphine|fentanyl|oxycodone|ibuprofen|paracetamol|acetaminophen|nsaids?|infusions?|injections?|tablets?|pumps?|patch(es)?|catheters?|nerve blocks?|devices?|products?|doses?|dosing)\b",
    )
    .expect("product pattern is valid")
});

/// Heuristic concreteness of an answer, in `[0, 1]`.
///
/// Adds 0.3 for a digit, 0.2 for a professional role, 0.25 for a time unit
/// and 0.25 for a product or treatment word.
pub fn specificity(quote: &str, summary: &str) -> f64 {
    let text = format!("{} {}", quote, summary);
    let mut score: f64 = 0.0;
    if DIGIT.is_match(&text) {
        score += 0.3;
    }
    if ROLE.is_match(&text) {
        score += 0.2;
    }
    if TIME_UNIT.is_match(&text) {
        score += 0.25;
    }
    if PRODUCT.is_match(&text) {
        score += 0.25;
    }
    score.min(1.0)
}

/// Weights of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub similarity: f64,
    pub confidence: f64,
    pub specificity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            similarity: 0.45,
            confidence: 0.35,
            specificity: 0.20,
        }
    }
}

pub fn composite_score(
    weights: &ScoringWeights,
    similarity: f64,
    confidence: f64,
    specificity: f64,
) -> f64 {
    weights.similarity * similarity
        + weights.confidence * confidence
        + weights.specificity * specificity
}

/// An extracted answer with its ranking signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAnswer {
    pub answer: ExtractedAnswer,
    pub window_id: String,
    pub chunk_id: String,
    pub similarity: f64,
    pub specificity: f64,
    pub composite_score: f64,
}

/// Scores answers and picks the winner per respondent.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    weights: ScoringWeights,
    usability_threshold: f64,
}

impl Scorer {
    pub fn new(weights: ScoringWeights, usability_threshold: f64) -> Self {
        Self {
            weights,
            usability_threshold,
        }
    }

    pub fn score(&self, answer: ExtractedAnswer, hit: &RetrievalHit) -> ScoredAnswer {
        let similarity = hit.similarity as f64;
        let specificity = specificity(&answer.quote, &answer.summary);
        let composite_score =
            composite_score(&self.weights, similarity, answer.confidence, specificity);

        ScoredAnswer {
            window_id: hit.window.id.clone(),
            chunk_id: hit.window.chunk_id.clone(),
            answer,
            similarity,
            specificity,
            composite_score,
        }
    }

    /// Highest composite score wins; ties keep the earliest candidate.
    ///
    /// This is not a plain maximum over all candidates: fallback answers are
    /// skipped before comparing, so a fallback with high similarity still
    /// loses to any real answer. A winner below the usability threshold is
    /// dropped.
    pub fn select_best(&self, candidates: Vec<ScoredAnswer>) -> Option<ScoredAnswer> {
        let mut best: Option<ScoredAnswer> = None;
        for candidate in candidates {
            if candidate.answer.is_fallback() {
                continue;
            }
            let better = best
                .as_ref()
                .map_or(true, |b| candidate.composite_score > b.composite_score);
            if better {
                best = Some(candidate);
            }
        }
        best.filter(|b| b.composite_score >= self.usability_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::Window;

    fn hit(id: &str, similarity: f32) -> RetrievalHit {
        RetrievalHit {
            window: Window {
                id: id.to_string(),
                chunk_id: "r-c0".to_string(),
                text: String::new(),
                start_offset: 0,
                end_offset: 0,
                token_count: 0,
            },
            similarity,
        }
    }

    fn answer(quote: &str, confidence: f64) -> ExtractedAnswer {
        ExtractedAnswer {
            quote: quote.to_string(),
            summary: String::new(),
            theme: "Other".to_string(),
            supported_by_quote: true,
            confidence,
            speaker_label: None,
            time_start: None,
            time_end: None,
            window_id: String::new(),
        }
    }

    #[test]
    fn test_specificity_components() {
        assert_eq!(specificity("I like it", ""), 0.0);
        assert!((specificity("I am a nurse", "") - 0.2).abs() < 1e-9);
        assert!((specificity("Twice a week", "") - 0.25).abs() < 1e-9);
        assert!((specificity("We give morphine", "") - 0.25).abs() < 1e-9);
        assert!((specificity("Ward 4", "") - 0.3).abs() < 1e-9);
        assert_eq!(
            specificity("As a nurse for 12 years", "she doses ibuprofen"),
            1.0
        );
    }

    #[test]
    fn test_composite_defaults() {
        let score = composite_score(&ScoringWeights::default(), 0.8, 0.9, 0.2);
        assert!((score - 0.715).abs() < 1e-9);
    }

    #[test]
    fn test_select_best_prefers_highest_then_first() {
        let scorer = Scorer::default();
        let a = scorer.score(answer("a", 0.6), &hit("w0", 0.5));
        let b = scorer.score(answer("b", 0.9), &hit("w1", 0.5));
        let c = scorer.score(answer("c", 0.9), &hit("w2", 0.5));

        let best = scorer.select_best(vec![a, b, c]).unwrap();
        assert_eq!(best.window_id, "w1");
    }

    #[test]
    fn test_fallback_never_wins() {
        let scorer = Scorer::default();
        let fallback = scorer.score(ExtractedAnswer::fallback("w0"), &hit("w0", 1.0));
        assert!(scorer.select_best(vec![fallback.clone()]).is_none());

        let weak = scorer.score(answer("weak", 0.0), &hit("w1", 0.0));
        assert!(fallback.composite_score > weak.composite_score);
        let best = scorer.select_best(vec![fallback, weak]).unwrap();
        assert_eq!(best.window_id, "w1");
    }

    #[test]
    fn test_usability_threshold() {
        let scorer = Scorer::new(ScoringWeights::default(), 0.5);
        let weak = scorer.score(answer("weak", 0.2), &hit("w0", 0.1));
        assert!(scorer.select_best(vec![weak]).is_none());
    }
}
