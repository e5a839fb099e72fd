//! HLS SuPER CLI entrypoint.
//!
//! Thin wrapper over the `cli` module: parse args, run the search and
//! processing flow, and exit with an appropriate status.
//! For programmatic use, prefer the library API (`hls_super::api`).

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();
    cli::run(args)
}
