//! Squash listener binary.
//!
//! Runs until Ctrl+C, merging the account's own messages on `!squash N`.

use tracing_subscriber::EnvFilter;

use draft_scanner::{commands, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("draft_scanner=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;
    commands::squash_run(&config).await?;
    Ok(())
}
