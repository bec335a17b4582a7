// src/cli.rs
//! CLI definitions for rombuilder
//!
//! The command implementations are in the `commands` module.

use clap::{ArgGroup, Parser};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rombuilder")]
#[command(author = "rombuilder contributors")]
#[command(version)]
#[command(about = "Build MiSTer arcade ROM images from MAME zip archives", long_about = None)]
#[command(group(
    ArgGroup::new("action")
        .args(["update_definitions", "list", "completions", "archives"])
        .multiple(true)
        .required(true)
))]
pub struct Cli {
    /// MAME zip archives to build ROM images from
    #[arg(value_name = "ARCHIVES")]
    pub archives: Vec<PathBuf>,

    /// Refresh ROM definitions from the registry before anything else
    #[arg(short = 'u', long)]
    pub update_definitions: bool,

    /// List known ROM definitions, optionally filtered
    #[arg(short, long, value_name = "FILTER", num_args = 0..=1, default_missing_value = "")]
    pub list: Option<String>,

    /// Directory to write ROM images to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Path to the definition snapshot (overrides the config file)
    #[arg(long, value_name = "PATH")]
    pub definitions: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL", value_enum)]
    pub completions: Option<Shell>,
}
