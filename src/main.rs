// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use rombuilder::{Config, DefinitionStore};
use tracing::debug;

mod cli;
mod commands;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "rombuilder", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.definitions {
        config.snapshot_path = path;
    }
    debug!("Using definitions at {}", config.snapshot_path.display());

    let store = if cli.update_definitions {
        commands::cmd_update_definitions(&config)?
    } else {
        DefinitionStore::load_from_snapshot(&config.snapshot_path)?
    };

    if let Some(filter) = cli.list.as_deref() {
        commands::cmd_list(&store, filter);
    }

    if !cli.archives.is_empty() {
        let code = commands::cmd_build(&store, &cli.archives, &cli.output_dir, &config)?;
        if code != 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}
