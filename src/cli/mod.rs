//! Command Line Interface (CLI) layer for HLS SuPER.
//!
//! Argument parsing (`args`), CLI error types (`errors`) and the run
//! orchestration (`runner`): build the query, search or reuse cached results,
//! report, then process when `--yes` is given. Applications embedding HLS SuPER
//! should call `hls_super::api` instead.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
