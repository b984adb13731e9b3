//! `precise-query`: a local command-line inspection tool over the core.
//!
//! Wires a dump file (through [`dump_store`]) and an in-memory metadata
//! fixture (through [`metadata_store`]) into [`resolver::Backend`] and runs
//! one of the `definitions`/`references`/`hover` pipelines, printing the
//! result as JSON. This is a debugging aid, not the out-of-scope HTTP/
//! GraphQL transport the core is designed to sit behind.

mod commands;
mod fixture;

use clap::Parser;
use observability_deps::tracing::error;
use std::process::ExitCode;

/// Command-line inspection tool for the precise-query core.
#[derive(Debug, Parser)]
#[clap(name = "precise-query", about = "Inspect LSIF-shaped code intelligence dumps")]
struct Cli {
    /// Log verbosity filter (also settable via `RUST_LOG`), e.g. `info`,
    /// `debug`, `precise_query=trace,resolver=debug`.
    #[clap(long, global = true, env = "RUST_LOG", default_value = "info")]
    log_filter: String,

    #[clap(subcommand)]
    command: commands::Command,
}

fn init_logging(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_filter);

    match commands::run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
