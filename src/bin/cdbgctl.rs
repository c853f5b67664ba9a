//! Thin process entrypoint: parse arguments, init `tracing`, dispatch, map
//! the crate's error taxonomy onto `spec.md` §6's exit codes. All actual
//! command logic lives in `cdbg_stream::cli` so it stays testable without a
//! process boundary.

use clap::Parser;

use cdbg_stream::cli::{dispatch, exit_code_for, Cli};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(err) = dispatch(cli) {
        tracing::error!(error = %err, "cdbgctl failed");
        std::process::exit(exit_code_for(&err));
    }
}
