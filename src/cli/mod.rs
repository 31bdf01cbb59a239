//! CLI module for Verbatim.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Verbatim - quote extraction for interview research
///
/// Finds the best-supported verbatim quote, summary and theme for every
/// respondent and every question of a discussion guide.
#[derive(Parser, Debug)]
#[command(name = "verbatim")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the question × respondent matrix for a set of transcripts
    Analyze {
        /// Discussion guide (.toml, .json, or sectioned text)
        #[arg(short, long)]
        guide: PathBuf,

        /// Transcript file or directory of .txt/.md transcripts
        #[arg(short, long)]
        transcripts: PathBuf,

        /// Also write the run as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not record the run in the local run history
        #[arg(long)]
        no_store: bool,
    },

    /// Show how a transcript is filtered and segmented
    Segment {
        /// Transcript file
        file: PathBuf,

        /// Print window text as well as offsets
        #[arg(long)]
        text: bool,
    },

    /// Show the windows retrieved for a question
    Retrieve {
        /// Transcript file
        file: PathBuf,

        /// Question to retrieve windows for
        #[arg(short, long)]
        question: String,
    },

    /// List stored runs
    Runs,

    /// Show a stored run
    Show {
        /// Run id (a unique prefix is enough)
        run_id: String,

        /// Print the raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "retrieval.top_k")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "verbatim",
            "-vv",
            "analyze",
            "--guide",
            "guide.toml",
            "--transcripts",
            "interviews/",
            "--no-store",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Analyze {
                guide,
                no_store,
                output,
                ..
            } => {
                assert_eq!(guide, PathBuf::from("guide.toml"));
                assert!(no_store);
                assert!(output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::try_parse_from(["verbatim", "config", "set", "retrieval.top_k", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Set { .. }
            }
        ));
    }
}
