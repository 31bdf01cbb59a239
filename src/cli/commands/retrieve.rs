//! Retrieve command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::source::load_transcript;
use anyhow::Result;
use std::path::Path;

/// Run the retrieve command.
pub async fn run_retrieve(file: &Path, question: &str, settings: Settings) -> Result<()> {
    preflight::check(Operation::Retrieve)?;

    let orchestrator = Orchestrator::new(settings)?;
    let doc = load_transcript(file, orchestrator.segmenter()).await?;
    let windows = doc.windows();

    let spinner = Output::spinner("Retrieving...");
    let prepared = orchestrator.retrieval().prepare(question);
    let result = orchestrator
        .retrieval()
        .find_relevant_windows(&prepared, &windows)
        .await;
    spinner.finish_and_clear();

    let retrieval = match result {
        Ok(retrieval) => retrieval,
        Err(e) => {
            Output::error(&format!("Retrieval failed: {}", e));
            return Err(e.into());
        }
    };

    Output::kv("Keywords", &prepared.keywords().join(", "));
    Output::kv(
        "Candidates",
        &format!("{}/{} windows", retrieval.stats.candidates, retrieval.stats.windows),
    );

    if retrieval.hits.is_empty() {
        Output::warning("No window mentions the question's keywords.");
        return Ok(());
    }

    for (rank, hit) in retrieval.hits.iter().enumerate() {
        Output::hit(rank + 1, &hit.window.id, hit.similarity, &hit.window.text);
    }

    if retrieval.stats.degraded_batches > 0 {
        println!();
        Output::warning(&format!(
            "{} embedding batches failed and were scored as zero",
            retrieval.stats.degraded_batches
        ));
    }

    Ok(())
}
