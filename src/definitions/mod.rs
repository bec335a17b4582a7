// src/definitions/mod.rs

//! ROM definition store
//!
//! Maps an archive base name (`dkong.zip`) to the recipe that builds its
//! ROM image. A store is an immutable value: it is loaded from the local
//! snapshot at startup, and a registry refresh builds a brand-new store
//! which the caller publishes through [`SharedDefinitions`].
//!
//! # Concurrency
//!
//! Readers take an `Arc` of the live store and keep using it even while a
//! refresh publishes a replacement. A refresh that fails or is cancelled
//! never becomes visible.

mod refresh;
pub mod snapshot;

pub use refresh::{refresh_from_registry, RefreshReport, RefreshWorker};

use crate::error::{Error, Result};
use crate::recipe::Recipe;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Recipes keyed by archive base name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionStore {
    recipes: BTreeMap<String, Recipe>,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the snapshot at `path`; a missing file yields an empty store
    pub fn load_from_snapshot(path: &Path) -> Result<Self> {
        if !path.is_file() {
            debug!("No definition snapshot at {}", path.display());
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!("Failed to read snapshot {}: {}", path.display(), e))
        })?;
        let recipes = snapshot::from_snapshot_str(&content)?;

        info!("Loaded {} definitions from {}", recipes.len(), path.display());
        Ok(Self { recipes })
    }

    /// Atomically write this store as the snapshot at `path`
    pub fn persist(&self, path: &Path) -> Result<()> {
        let content = snapshot::to_snapshot_string(self.recipes.values())?;
        snapshot::write_snapshot(path, &content)
    }

    /// Insert a recipe under its own archive name, returning any recipe it replaced
    pub fn insert(&mut self, recipe: Recipe) -> Option<Recipe> {
        self.recipes.insert(recipe.archive_name.clone(), recipe)
    }

    pub fn lookup(&self, archive_base_name: &str) -> Option<&Recipe> {
        self.recipes.get(archive_base_name)
    }

    /// Look up by the base name of an archive path
    pub fn lookup_archive(&self, archive_path: &Path) -> Result<&Recipe> {
        let name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.lookup(&name).ok_or(Error::RecipeNotFound(name))
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Recipes in key order
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// Recipes whose key, output file or core name contains `pattern`
    /// (case-insensitive)
    pub fn filter<'a>(&'a self, pattern: &str) -> Vec<&'a Recipe> {
        let pattern = pattern.to_lowercase();
        self.iter()
            .filter(|recipe| {
                recipe.archive_name.to_lowercase().contains(&pattern)
                    || recipe
                        .output_file
                        .as_ref()
                        .is_some_and(|ofile| ofile.to_lowercase().contains(&pattern))
                    || recipe
                        .core_name()
                        .is_some_and(|core| core.to_lowercase().contains(&pattern))
            })
            .collect()
    }
}

impl FromIterator<Recipe> for DefinitionStore {
    fn from_iter<I: IntoIterator<Item = Recipe>>(iter: I) -> Self {
        let mut store = Self::new();
        for recipe in iter {
            store.insert(recipe);
        }
        store
    }
}

/// Live store shared between readers and the refresh worker
#[derive(Debug, Clone, Default)]
pub struct SharedDefinitions {
    inner: Arc<RwLock<Arc<DefinitionStore>>>,
}

impl SharedDefinitions {
    pub fn new(store: DefinitionStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(store))),
        }
    }

    /// Snapshot of the current store
    pub fn current(&self) -> Arc<DefinitionStore> {
        let guard = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*guard)
    }

    /// Replace the live store
    pub fn publish(&self, store: DefinitionStore) {
        let mut guard = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(store);
    }
}
