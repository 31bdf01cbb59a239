//! Analyze command implementation.

use super::show::print_run;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::source::{DocumentSource, FsDocumentSource};
use crate::store::{JsonFileSink, ResultSink, SqliteRunStore};
use anyhow::Result;
use std::path::Path;

/// Run the analyze command.
pub async fn run_analyze(
    guide: &Path,
    transcripts: &Path,
    output: Option<&Path>,
    no_store: bool,
    settings: Settings,
) -> Result<()> {
    preflight::check(Operation::Analyze)?;
    preflight::check_inputs(guide, transcripts)?;
    preflight::check_settings(&settings)?;

    let orchestrator = Orchestrator::new(settings.clone())?;
    let source = FsDocumentSource::new(transcripts, guide, orchestrator.segmenter().clone());

    let question_count = source.guide().await?.len();
    Output::info(&format!(
        "Analyzing {} questions from {}",
        question_count,
        source.guide_name()
    ));

    let progress = Output::progress_bar(question_count as u64, "Starting...");
    let orchestrator = orchestrator.with_progress(progress.clone());

    let store = if no_store {
        None
    } else {
        Some(SqliteRunStore::new(&settings.sqlite_path())?)
    };
    let json_sink = output.map(JsonFileSink::new);

    let mut sinks: Vec<&dyn ResultSink> = Vec::new();
    if let Some(store) = &store {
        sinks.push(store);
    }
    if let Some(json_sink) = &json_sink {
        sinks.push(json_sink);
    }

    let result = orchestrator.run(&source, &sinks).await;
    progress.finish_and_clear();

    match result {
        Ok(run) => {
            print_run(&run);
            println!();
            if store.is_some() {
                Output::success(&format!("Saved run {}", run.id));
            }
            if let Some(path) = output {
                Output::success(&format!("Wrote {}", path.display()));
            }
        }
        Err(e) => {
            Output::error(&format!("Analysis failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
