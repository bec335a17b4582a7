// src/commands.rs
//! Command handlers for the rombuilder CLI

use anyhow::{Context, Result};
use rombuilder::{
    assemble_from_store, batch_exit_code, refresh_from_registry, CliProgress, Config,
    DefinitionStore, HttpClient, LogProgress, Outcome, Registry,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

/// Refresh definitions from the registry and write the snapshot
pub fn cmd_update_definitions(config: &Config) -> Result<DefinitionStore> {
    let client = HttpClient::new(config)?;
    let registry = Registry::new(config.clone(), Arc::new(client));
    let progress = CliProgress::new();

    let report = refresh_from_registry(
        &registry,
        &config.snapshot_path,
        &progress,
        &AtomicBool::new(false),
    )
    .context("Failed to update ROM definitions")?;

    println!(
        "ROM definitions found: {} ({} sources, {} skipped)",
        report.store.len(),
        report.processed,
        report.skipped
    );
    info!("Definitions written to {}", config.snapshot_path.display());
    Ok(report.store)
}

/// Print known definitions as `core  zip  ofile` rows
pub fn cmd_list(store: &DefinitionStore, filter: &str) {
    let recipes = if filter.is_empty() {
        store.iter().collect::<Vec<_>>()
    } else {
        store.filter(filter)
    };

    if recipes.is_empty() {
        println!("No ROM definitions found.");
        return;
    }

    let rows: Vec<(String, &str, &str)> = recipes
        .iter()
        .map(|r| {
            (
                r.core_name().unwrap_or_else(|| "-".to_string()),
                r.archive_name.as_str(),
                r.output_file.as_deref().unwrap_or("-"),
            )
        })
        .collect();
    let core_width = rows.iter().map(|(core, _, _)| core.len()).max().unwrap_or(0);
    let zip_width = rows.iter().map(|(_, zip, _)| zip.len()).max().unwrap_or(0);

    for (core, zip, ofile) in &rows {
        println!("{:core_width$}  {:zip_width$}  {}", core, zip, ofile);
    }
    println!("\nTotal: {} definition(s)", rows.len());
}

/// Build every archive, printing one outcome line each
///
/// Returns the batch exit code.
pub fn cmd_build(
    store: &DefinitionStore,
    archives: &[PathBuf],
    output_dir: &Path,
    config: &Config,
) -> Result<i32> {
    if store.is_empty() {
        println!("No ROM definitions loaded; run with --update-definitions first.");
    }

    let client = HttpClient::new(config)?;
    let mut outcomes: Vec<Outcome> = Vec::with_capacity(archives.len());

    for archive in archives {
        info!("Building from {}", archive.display());
        let outcome = assemble_from_store(store, archive, None, output_dir, &client, &LogProgress);
        println!("{}: {}", archive.display(), outcome);
        outcomes.push(outcome);
    }

    Ok(batch_exit_code(&outcomes))
}
