// src/repository/registry.rs

//! Registry of recipe-publishing sources
//!
//! Every arcade core lives in its own `Arcade-<Title>_MiSTer` repository
//! under one account namespace and may publish a recipe at
//! `releases/build_rom.ini`. The listing is paged; [`SourceListing`] walks
//! the pages lazily as the caller consumes it.

use crate::config::Config;
use crate::error::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

use super::client::Fetch;

/// Conventional recipe location beneath a source's web location
const RECIPE_PATH: &str = "raw/master/releases/build_rom.ini";

/// A recipe-publishing repository
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Source {
    pub name: String,
    pub html_url: String,
}

impl Source {
    /// Where this source's recipe is expected to be
    pub fn recipe_url(&self) -> String {
        format!("{}/{}", self.html_url.trim_end_matches('/'), RECIPE_PATH)
    }
}

/// Extract the title from an `Arcade-<Title>_MiSTer` repository name
pub fn core_name_from_repo(repo: &str) -> String {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"^Arcade-(.*)_MiSTer$").ok());

    if let Some(caps) = pattern.as_ref().and_then(|re| re.captures(repo)) {
        if let Some(title) = caps.get(1) {
            return title.as_str().to_string();
        }
    }

    repo.strip_prefix("Arcade-").unwrap_or(repo).to_string()
}

/// Client for the source listing and per-source recipe fetches
#[derive(Clone)]
pub struct Registry {
    config: Config,
    fetcher: Arc<dyn Fetch>,
}

impl Registry {
    pub fn new(config: Config, fetcher: Arc<dyn Fetch>) -> Self {
        Self { config, fetcher }
    }

    /// Lazily enumerate matching sources
    ///
    /// Nothing is requested until the iterator is advanced; each call starts
    /// over from the first page.
    pub fn list_sources(&self) -> SourceListing {
        SourceListing {
            registry: self.clone(),
            page: 0,
            buffered: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Fetch a source's recipe text
    ///
    /// `Ok(None)` means the source answered but publishes no recipe.
    pub fn fetch_recipe(&self, source: &Source) -> Result<Option<String>> {
        let url = source.recipe_url();
        let response = self.fetcher.get(&url)?;
        if !response.is_success() {
            debug!("No recipe at {} (HTTP {})", url, response.status);
            return Ok(None);
        }
        response.into_text(&url).map(Some)
    }

    fn fetch_page(&self, page: u32) -> Result<Vec<Source>> {
        let url = self.config.listing_url(page);
        info!("Fetching source listing page {} from {}", page, url);

        let body = self.fetcher.get_bytes(&url)?;
        serde_json::from_slice(&body).map_err(|e| {
            Error::ParseError(format!("Failed to parse source listing from {}: {}", url, e))
        })
    }
}

/// Lazy, non-restartable sequence of sources
pub struct SourceListing {
    registry: Registry,
    page: u32,
    buffered: VecDeque<Source>,
    exhausted: bool,
}

impl Iterator for SourceListing {
    type Item = Result<Source>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(source) = self.buffered.pop_front() {
                return Some(Ok(source));
            }
            if self.exhausted {
                return None;
            }

            self.page += 1;
            let page = match self.registry.fetch_page(self.page) {
                Ok(page) => page,
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            };

            if page.len() < self.registry.config.per_page as usize {
                self.exhausted = true;
            }

            let prefix = &self.registry.config.repo_prefix;
            self.buffered
                .extend(page.into_iter().filter(|source| source.name.starts_with(prefix)));
        }
    }
}
