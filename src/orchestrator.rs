//! Pipeline orchestrator for Verbatim.
//!
//! Runs every guide question, in guide order, against every transcript:
//! retrieval per transcript, one extraction per retrieved window, then
//! scoring and selection of one winner per respondent.

use crate::completion::{CompletionOptions, OpenAIChatCompleter, StructuredCompleter};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, VerbatimError};
use crate::extraction::{Extractor, ScoredAnswer, Scorer, ScoringWeights, ThemeVocabulary};
use crate::matrix::{AnalysisResult, MatrixAssembler, RunCounters};
use crate::openai::api_key;
use crate::pool::TaskPool;
use crate::retrieval::{RetrievalEngine, RetrievalHit};
use crate::retry::{CallStats, RetryCaller};
use crate::segmentation::Segmenter;
use crate::source::DocumentSource;
use crate::store::{AnalysisRun, ResultSink};
use crate::transcript::{GuideItem, TranscriptDocument};
use futures::future::join_all;
use indicatif::ProgressBar;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Progress of one (question, transcript) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairState {
    Retrieved,
    Extracted,
    Scored,
    Assembled,
}

/// Run-wide counters, updated from concurrent tasks.
#[derive(Debug, Default)]
struct RunTally {
    tokens: AtomicU64,
    retries: AtomicU64,
    rate_limit_hits: AtomicU64,
}

impl RunTally {
    fn record_call(&self, stats: CallStats) {
        self.retries.fetch_add(stats.retries as u64, Ordering::SeqCst);
        self.rate_limit_hits
            .fetch_add(stats.rate_limit_hits as u64, Ordering::SeqCst);
    }

    fn record_tokens(&self, tokens: u64) {
        self.tokens.fetch_add(tokens, Ordering::SeqCst);
    }

    fn snapshot(&self) -> RunCounters {
        RunCounters {
            total_tokens: self.tokens.load(Ordering::SeqCst),
            retry_count: self.retries.load(Ordering::SeqCst),
            rate_limit_hit_count: self.rate_limit_hits.load(Ordering::SeqCst),
        }
    }
}

/// Winners for one guide question.
#[derive(Debug, Clone)]
pub struct QuestionAnswers {
    /// Winning answer per respondent label, in transcript order.
    pub winners: Vec<(String, ScoredAnswer)>,
    pub counters: RunCounters,
}

/// The main orchestrator for the Verbatim pipeline.
pub struct Orchestrator {
    settings: Settings,
    segmenter: Segmenter,
    embed_pool: Arc<TaskPool>,
    extract_pool: Arc<TaskPool>,
    retrieval: RetrievalEngine,
    extractor: Extractor,
    scorer: Scorer,
    progress: ProgressBar,
}

impl Orchestrator {
    /// Create a new orchestrator backed by the OpenAI API.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let key = api_key()
            .ok_or_else(|| VerbatimError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?);

        let completer: Arc<dyn StructuredCompleter> = Arc::new(OpenAIChatCompleter::new(
            &settings.extraction.api_base,
            &key,
            &settings.extraction.model,
            Duration::from_secs(settings.extraction.timeout_seconds),
        )?);

        info!(
            "Using {} for embeddings and {} for extraction",
            settings.embedding.model, settings.extraction.model
        );

        Self::with_components(settings, prompts, embedder, completer)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn StructuredCompleter>,
    ) -> Result<Self> {
        settings.validate()?;

        let segmenter = Segmenter::new(settings.segmentation_config())?;
        let retry = RetryCaller::new(settings.retry_policy());
        let embed_pool = TaskPool::shared("embedding", settings.concurrency.embedding_pool);
        let extract_pool = TaskPool::shared("extraction", settings.concurrency.extraction_pool);

        let retrieval = RetrievalEngine::new(embedder, embed_pool.clone(), retry.clone())
            .with_top_k(settings.retrieval.top_k)
            .with_batch_size(settings.embedding.batch_size);

        let vocabulary = ThemeVocabulary::builtin().with_overrides(&settings.vocabulary);
        let options = CompletionOptions {
            temperature: settings.extraction.temperature,
            json_mode: settings.extraction.json_mode,
        };
        let extractor = Extractor::new(
            completer,
            extract_pool.clone(),
            retry,
            prompts,
            vocabulary,
            options,
        );

        let scorer = Scorer::new(
            ScoringWeights {
                similarity: settings.scoring.similarity_weight,
                confidence: settings.scoring.confidence_weight,
                specificity: settings.scoring.specificity_weight,
            },
            settings.scoring.usability_threshold,
        );

        Ok(Self {
            settings,
            segmenter,
            embed_pool,
            extract_pool,
            retrieval,
            extractor,
            scorer,
            progress: ProgressBar::hidden(),
        })
    }

    /// Report per-question progress on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn retrieval(&self) -> &RetrievalEngine {
        &self.retrieval
    }

    pub fn embedding_pool(&self) -> &TaskPool {
        &self.embed_pool
    }

    pub fn extraction_pool(&self) -> &TaskPool {
        &self.extract_pool
    }

    /// Load inputs from `source`, analyze them and hand the run to every sink.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        source: &dyn DocumentSource,
        sinks: &[&dyn ResultSink],
    ) -> Result<AnalysisRun> {
        let guide = source.guide().await?;
        let transcripts = source.transcripts().await?;

        let result = self.analyze(&guide, &transcripts).await?;
        let run = AnalysisRun::new(
            source.guide_name(),
            transcripts.iter().map(|t| t.label.clone()).collect(),
            result,
        );

        for sink in sinks {
            sink.persist(&run).await?;
        }

        info!("Run {} complete", run.id);
        Ok(run)
    }

    /// Build the result matrix for `guide` over `transcripts`.
    ///
    /// Questions run one after another. The first unrecoverable error fails
    /// the whole run.
    #[instrument(skip_all, fields(questions = guide.len(), transcripts = transcripts.len()))]
    pub async fn analyze(
        &self,
        guide: &[GuideItem],
        transcripts: &[TranscriptDocument],
    ) -> Result<AnalysisResult> {
        if guide.is_empty() {
            return Err(VerbatimError::InvalidInput("the guide has no questions".to_string()));
        }
        if transcripts.is_empty() {
            return Err(VerbatimError::InvalidInput("no transcripts to analyze".to_string()));
        }

        let labels: Vec<String> = transcripts.iter().map(|t| t.label.clone()).collect();
        let mut assembler = MatrixAssembler::new(labels);
        let mut totals = RunCounters::default();

        self.progress.set_length(guide.len() as u64);

        for (index, item) in guide.iter().enumerate() {
            self.progress.set_message(item.question.clone());
            info!(question = index + 1, total = guide.len(), "{}", item.question);

            let answers = self.answer_question(item, transcripts).await?;
            totals.total_tokens += answers.counters.total_tokens;
            totals.retry_count += answers.counters.retry_count;
            totals.rate_limit_hit_count += answers.counters.rate_limit_hit_count;

            for (label, _) in &answers.winners {
                debug!(question = index, respondent = %label, state = ?PairState::Assembled);
            }
            assembler.push(item, answers.winners)?;
            self.progress.inc(1);
        }

        let result = assembler.finish(totals);
        info!(
            answered = result.metadata.answered_question_count,
            questions = result.metadata.total_question_count,
            tokens = result.metadata.total_tokens,
            retries = result.metadata.retry_count,
            "Analysis complete"
        );
        Ok(result)
    }

    /// Retrieve, extract, score and select for a single guide question.
    pub async fn answer_question(
        &self,
        item: &GuideItem,
        transcripts: &[TranscriptDocument],
    ) -> Result<QuestionAnswers> {
        let tally = RunTally::default();
        let prepared = self.retrieval.prepare(&item.question);

        let retrievals = join_all(transcripts.iter().map(|doc| {
            let windows = doc.windows();
            let prepared = &prepared;
            async move { self.retrieval.find_relevant_windows(prepared, &windows).await }
        }))
        .await;

        let mut hits_per_doc: Vec<Vec<RetrievalHit>> = Vec::with_capacity(transcripts.len());
        for (doc, retrieval) in transcripts.iter().zip(retrievals) {
            let retrieval = retrieval?;
            tally.retries
                .fetch_add(retrieval.stats.retries as u64, Ordering::SeqCst);
            tally.rate_limit_hits
                .fetch_add(retrieval.stats.rate_limit_hits as u64, Ordering::SeqCst);
            debug!(
                respondent = %doc.label,
                hits = retrieval.hits.len(),
                state = ?PairState::Retrieved
            );
            hits_per_doc.push(retrieval.hits);
        }

        let tasks = transcripts
            .iter()
            .enumerate()
            .flat_map(|(doc_idx, doc)| {
                hits_per_doc[doc_idx]
                    .iter()
                    .map(move |hit| (doc_idx, &doc.label, hit))
            })
            .map(|(doc_idx, label, hit)| {
                let tally = &tally;
                async move {
                    let extraction = self.extractor.extract_answer(item, hit, label).await?;
                    tally.record_call(extraction.stats);
                    tally.record_tokens(extraction.tokens_used);
                    Ok::<_, VerbatimError>((doc_idx, hit, extraction))
                }
            });

        let extractions = join_all(tasks).await;

        let mut candidates: Vec<Vec<ScoredAnswer>> = vec![Vec::new(); transcripts.len()];
        for outcome in extractions {
            let (doc_idx, hit, extraction) = outcome?;
            candidates[doc_idx].push(self.scorer.score(extraction.answer, hit));
        }

        let mut winners = Vec::new();
        for (doc, scored) in transcripts.iter().zip(candidates) {
            if !scored.is_empty() {
                debug!(respondent = %doc.label, candidates = scored.len(), state = ?PairState::Extracted);
            }
            if let Some(best) = self.scorer.select_best(scored) {
                debug!(
                    respondent = %doc.label,
                    window = %best.window_id,
                    score = best.composite_score,
                    state = ?PairState::Scored
                );
                winners.push((doc.label.clone(), best));
            }
        }

        Ok(QuestionAnswers {
            winners,
            counters: tally.snapshot(),
        })
    }
}
