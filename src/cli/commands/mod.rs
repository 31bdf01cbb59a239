//! CLI command implementations.

mod analyze;
mod config;
mod retrieve;
mod runs;
mod segment;
mod show;

pub use analyze::run_analyze;
pub use config::run_config;
pub use retrieve::run_retrieve;
pub use runs::run_runs;
pub use segment::run_segment;
pub use show::run_show;
