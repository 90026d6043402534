//! Draft scanner CLI - main entry point
//!
//! Prints every conversation that holds an unsent draft, then exits.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use draft_scanner::{commands, Config, Error, Result};

#[derive(Parser)]
#[command(name = "draft_scanner")]
#[command(about = "List Telegram conversations with unsent drafts", long_about = None)]
#[command(version)]
struct Cli {}

async fn run() -> Result<usize> {
    let config = Config::load()?;
    commands::drafts_run(&config).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let _cli = Cli::parse();

    // Logs and login prompts go to stderr so stdout carries only the drafts
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,draft_scanner=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err, &mut std::io::stderr()),
    }
}

/// Single user-facing report of a failed run.
fn report_failure<W: Write>(err: &Error, out: &mut W) -> ExitCode {
    let _ = writeln!(out, "Error: {}", err);
    ExitCode::from(err.exit_code())
}
