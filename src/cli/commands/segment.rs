//! Segment command implementation.

use crate::cli::output::preview;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::segmentation::Segmenter;
use crate::source::load_transcript;
use anyhow::Result;
use std::path::Path;

/// Run the segment command.
pub async fn run_segment(file: &Path, show_text: bool, settings: Settings) -> Result<()> {
    preflight::check(Operation::Segment)?;

    let segmenter = Segmenter::new(settings.segmentation_config())?;
    let doc = load_transcript(file, &segmenter).await?;

    if doc.is_empty() {
        Output::warning("No respondent text left after removing moderator turns.");
        return Ok(());
    }

    Output::header(&format!("{} ({})", doc.label, doc.file_id));

    for chunk in &doc.chunks {
        println!(
            "\n{} bytes {}..{}, ~{} tokens, {} windows",
            console::style(&chunk.id).bold(),
            chunk.start_offset,
            chunk.end_offset,
            chunk.token_count,
            chunk.windows.len()
        );
        for window in &chunk.windows {
            Output::kv(
                &window.id,
                &format!(
                    "{}..{} (~{} tokens)",
                    window.start_offset, window.end_offset, window.token_count
                ),
            );
            if show_text {
                println!("      {}", preview(&window.text, 160));
            }
        }
    }

    println!();
    Output::kv("Chunks", &doc.chunks.len().to_string());
    Output::kv("Windows", &doc.windows().len().to_string());

    Ok(())
}
