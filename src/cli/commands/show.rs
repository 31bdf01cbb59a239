//! Show command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::{AnalysisRun, SqliteRunStore};
use anyhow::Result;

/// Print a run's metadata and its question × respondent matrix.
pub fn print_run(run: &AnalysisRun) {
    let metadata = &run.result.metadata;

    Output::header(&format!("Run {}", run.id));
    Output::kv("Guide", &run.guide_name);
    Output::kv("Created", &run.created_at.format("%Y-%m-%d %H:%M UTC").to_string());
    Output::kv("Respondents", &run.transcript_labels.join(", "));
    Output::kv(
        "Answered",
        &format!(
            "{}/{} questions",
            metadata.answered_question_count, metadata.total_question_count
        ),
    );
    Output::kv("Supported quotes", &metadata.supported_quote_count.to_string());
    Output::kv("Tokens", &metadata.total_tokens.to_string());
    Output::kv(
        "Retries",
        &format!(
            "{} ({} rate limited)",
            metadata.retry_count, metadata.rate_limit_hit_count
        ),
    );

    for (index, question) in run.result.questions.iter().enumerate() {
        Output::header(&format!(
            "Q{}. [{}] {}",
            index + 1,
            question.question_type,
            question.question
        ));

        if question.respondents.is_empty() {
            Output::kv("No answers", "no respondent addressed this question");
            continue;
        }

        for (label, answer) in &question.respondents {
            Output::answer(label, &answer.theme, &answer.quote, &answer.summary);
        }
    }
}

/// Run the show command.
pub fn run_show(run_id: &str, json: bool, settings: Settings) -> Result<()> {
    let store = SqliteRunStore::new(&settings.sqlite_path())?;
    let run = store.get_run(run_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_run(&run);
    }

    Ok(())
}
