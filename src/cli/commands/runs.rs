//! Runs command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::SqliteRunStore;
use anyhow::Result;
use console::style;

/// Run the runs command.
pub fn run_runs(settings: Settings) -> Result<()> {
    let store = SqliteRunStore::new(&settings.sqlite_path())?;
    let runs = store.list_runs()?;

    if runs.is_empty() {
        Output::info("No runs stored yet. Use 'verbatim analyze' to create one.");
        return Ok(());
    }

    Output::header(&format!("Stored runs ({})", runs.len()));
    println!();

    for run in &runs {
        println!(
            "  {} {} {} ({} respondents, {}/{} questions answered)",
            style("*").cyan(),
            style(&run.id.to_string()[..8]).bold(),
            style(run.created_at.format("%Y-%m-%d %H:%M")).dim(),
            run.respondent_count,
            run.answered_question_count,
            run.question_count,
        );
        println!("    {}", run.guide_name);
    }

    Ok(())
}
