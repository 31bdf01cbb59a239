//! The question × respondent result matrix.

use crate::error::{Result, VerbatimError};
use crate::extraction::ScoredAnswer;
use crate::transcript::GuideItem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a winning quote came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSource {
    pub participant_label: String,
    pub chunk_id: String,
    pub window_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

/// One respondent's answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespondentAnswer {
    pub quote: String,
    pub summary: String,
    pub theme: String,
    pub source: AnswerSource,
}

/// A guide question with the winning answer per respondent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixQuestion {
    /// Theme category, verbatim from the guide.
    pub question_type: String,
    /// Question text, verbatim from the guide.
    pub question: String,
    /// Keyed by respondent label. Respondents without a usable answer are absent.
    pub respondents: BTreeMap<String, RespondentAnswer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub total_tokens: u64,
    pub supported_quote_count: u64,
    pub answered_question_count: u64,
    pub total_question_count: u64,
    pub total_respondent_count: u64,
    pub retry_count: u64,
    pub rate_limit_hit_count: u64,
}

/// Final output of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub questions: Vec<MatrixQuestion>,
    pub metadata: RunMetadata,
}

/// Counters accumulated by the run outside the matrix itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub total_tokens: u64,
    pub retry_count: u64,
    pub rate_limit_hit_count: u64,
}

/// Folds per-question winners into an [`AnalysisResult`], in guide order.
#[derive(Debug)]
pub struct MatrixAssembler {
    respondent_labels: Vec<String>,
    questions: Vec<MatrixQuestion>,
    supported_quote_count: u64,
}

impl MatrixAssembler {
    pub fn new(respondent_labels: Vec<String>) -> Self {
        Self {
            respondent_labels,
            questions: Vec::new(),
            supported_quote_count: 0,
        }
    }

    /// Append the row for `item`. Winners must belong to known respondents.
    pub fn push(
        &mut self,
        item: &GuideItem,
        winners: impl IntoIterator<Item = (String, ScoredAnswer)>,
    ) -> Result<()> {
        let mut respondents = BTreeMap::new();

        for (label, winner) in winners {
            if !self.respondent_labels.contains(&label) {
                return Err(VerbatimError::InvalidInput(format!(
                    "unknown respondent '{}'",
                    label
                )));
            }
            if winner.answer.supported_by_quote {
                self.supported_quote_count += 1;
            }

            let answer = winner.answer;
            respondents.insert(
                label.clone(),
                RespondentAnswer {
                    quote: answer.quote,
                    summary: answer.summary,
                    theme: answer.theme,
                    source: AnswerSource {
                        participant_label: label,
                        chunk_id: winner.chunk_id,
                        window_id: winner.window_id,
                        time_start: answer.time_start,
                        time_end: answer.time_end,
                    },
                },
            );
        }

        self.questions.push(MatrixQuestion {
            question_type: item.theme.clone(),
            question: item.question.clone(),
            respondents,
        });
        Ok(())
    }

    pub fn finish(self, counters: RunCounters) -> AnalysisResult {
        let answered = self
            .questions
            .iter()
            .filter(|q| !q.respondents.is_empty())
            .count();

        AnalysisResult {
            metadata: RunMetadata {
                total_tokens: counters.total_tokens,
                supported_quote_count: self.supported_quote_count,
                answered_question_count: answered as u64,
                total_question_count: self.questions.len() as u64,
                total_respondent_count: self.respondent_labels.len() as u64,
                retry_count: counters.retry_count,
                rate_limit_hit_count: counters.rate_limit_hit_count,
            },
            questions: self.questions,
        }
    }
}
