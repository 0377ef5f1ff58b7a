use anyhow::Context;
use clap::Parser;
use cryptdrive::DriveStorage;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{execute_command, load_config, Cli};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let storage = DriveStorage::open(config)
        .await
        .context("failed to open drive storage")?;

    if let Some(command) = cli.command {
        execute_command(&storage, command).await?;
    }

    Ok(())
}
