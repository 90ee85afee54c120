//! metafetch CLI - resolve content identifiers and fetch their metadata
//!
//! Records and metadata are printed to stdout as one JSON object per line;
//! logs and per-input failures go to stderr.

use anyhow::{Context, Result, bail};
use clap::Parser;
use metafetch_core::{Config, Pipeline, Registry};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    let config = load_config(&cli)?;
    let failures = execute_command(cli.command, &config).await?;
    if failures > 0 {
        bail!("{failures} input(s) failed");
    }
    Ok(())
}

fn initialize_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::load()?,
    }
    .apply_env();
    if cli.no_cache {
        config.cache.enabled = false;
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache.dir.clone_from(dir);
    }
    Ok(config)
}

/// Run one command, returning how many inputs failed.
async fn execute_command(command: Commands, config: &Config) -> Result<usize> {
    match command {
        Commands::Platforms => {
            commands::platforms(config)?;
            Ok(0)
        },
        Commands::Resolve { inputs } => {
            let registry = Registry::builtin(config)?;
            commands::resolve(&registry, &inputs)
        },
        Commands::Fetch { inputs } => {
            let pipeline = Pipeline::from_config(config).await?;
            Ok(commands::fetch(&pipeline, &inputs).await)
        },
    }
}
