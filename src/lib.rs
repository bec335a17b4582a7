// src/lib.rs

//! MiSTer arcade ROM builder
//!
//! Builds the ROM image a MiSTer arcade core expects from a MAME zip
//! archive, following a recipe (`build_rom.ini`) published by the core's
//! repository.
//!
//! # Architecture
//!
//! - Recipes: line-oriented `key=value` text naming the archive members
//!   (and remote files) to concatenate, in order
//! - Definitions: every known recipe keyed by archive name, cached locally
//!   as a TOML snapshot and refreshed from the registry
//! - Assembly: concatenate inputs into the output image, verify its MD5

pub mod assemble;
pub mod config;
pub mod definitions;
mod error;
pub mod hash;
pub mod progress;
pub mod recipe;
pub mod repository;

pub use assemble::{
    assemble, assemble_from_store, assemble_with_client, batch_exit_code, default_output_path,
    Outcome, OutcomeKind,
};
pub use config::Config;
pub use definitions::{
    refresh_from_registry, DefinitionStore, RefreshReport, RefreshWorker, SharedDefinitions,
};
pub use error::{Error, Result};
pub use hash::{Hash, Hasher};
pub use progress::{
    AssemblyEvent, CallbackProgress, ChannelProgress, CliProgress, LogProgress, ProgressEvent,
    ProgressObserver, RefreshEvent, SilentProgress,
};
pub use recipe::{parse_recipe, InputSpec, Recipe};
pub use repository::{Fetch, FetchResponse, HttpClient, Registry, Source};
