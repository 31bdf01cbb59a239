//! Structured answer extraction for one retrieved window.

use super::parser::normalize_answer;
use super::vocabulary::ThemeVocabulary;
use super::ExtractedAnswer;
use crate::completion::{CompletionOptions, StructuredCompleter};
use crate::config::Prompts;
use crate::error::{Result, VerbatimError};
use crate::pool::TaskPool;
use crate::retrieval::RetrievalHit;
use crate::retry::{CallStats, RetryCaller};
use crate::transcript::GuideItem;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Result of one extraction call.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub answer: ExtractedAnswer,
    pub tokens_used: u64,
    pub stats: CallStats,
}

/// Calls the completer for a window through the extraction pool and retry caller.
pub struct Extractor {
    completer: Arc<dyn StructuredCompleter>,
    pool: Arc<TaskPool>,
    retry: RetryCaller,
    prompts: Prompts,
    vocabulary: ThemeVocabulary,
    options: CompletionOptions,
}

impl Extractor {
    pub fn new(
        completer: Arc<dyn StructuredCompleter>,
        pool: Arc<TaskPool>,
        retry: RetryCaller,
        prompts: Prompts,
        vocabulary: ThemeVocabulary,
        options: CompletionOptions,
    ) -> Self {
        Self {
            completer,
            pool,
            retry,
            prompts,
            vocabulary,
            options,
        }
    }

    pub fn vocabulary(&self) -> &ThemeVocabulary {
        &self.vocabulary
    }

    fn user_prompt(&self, item: &GuideItem, hit: &RetrievalHit, respondent: &str) -> String {
        let themes = self
            .vocabulary
            .terms_for(&item.theme)
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(", ");

        let mut vars = HashMap::new();
        vars.insert("theme".to_string(), item.theme.clone());
        vars.insert("question".to_string(), item.question.clone());
        vars.insert("respondent".to_string(), respondent.to_string());
        vars.insert("excerpt".to_string(), hit.window.text.clone());
        vars.insert("themes".to_string(), themes);

        self.prompts
            .render_with_custom(&self.prompts.extraction.user, &vars)
    }

    /// Extract an answer to `item` from the window of `hit`.
    ///
    /// Malformed model output yields the fallback answer. Only exhausted
    /// retries (or a closed pool) are errors.
    #[instrument(skip(self, item, hit), fields(window = %hit.window.id))]
    pub async fn extract_answer(
        &self,
        item: &GuideItem,
        hit: &RetrievalHit,
        respondent: &str,
    ) -> Result<Extraction> {
        let system = self
            .prompts
            .render_with_custom(&self.prompts.extraction.system, &HashMap::new());
        let user = self.user_prompt(item, hit, respondent);

        let attempted = self
            .pool
            .submit(|| {
                self.retry.call("extract answer", || {
                    self.completer
                        .complete_structured(&system, &user, &self.options)
                })
            })
            .await?
            .map_err(|failure| VerbatimError::exhausted("extract answer", failure))?;

        let completion = attempted.value;
        let answer = normalize_answer(&completion.content, &item.theme, &self.vocabulary, &hit.window);

        debug!(
            fallback = answer.is_fallback(),
            confidence = answer.confidence,
            tokens = completion.usage.total_tokens,
            "answer extracted"
        );

        Ok(Extraction {
            answer,
            tokens_used: completion.usage.total_tokens,
            stats: attempted.stats,
        })
    }
}
