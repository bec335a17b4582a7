// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use rombuilder::{Config, Fetch, FetchResponse, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Write a zip archive holding `members` (stored, uncompressed).
pub fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

/// Create a temp dir holding `name` as a zip of `members`.
///
/// Returns (TempDir, archive path) - keep the TempDir alive to prevent cleanup.
pub fn archive_fixture(name: &str, members: &[(&str, &[u8])]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    write_zip(&path, members);
    (dir, path)
}

/// Fetcher serving canned responses; unknown URLs get a 404.
#[derive(Default)]
pub struct CannedFetch {
    responses: HashMap<String, FetchResponse>,
    requests: Mutex<Vec<String>>,
}

impl CannedFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: &[u8]) -> Self {
        self.responses.insert(url.to_string(), FetchResponse::ok(body));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), FetchResponse::status(status));
        self
    }

    /// Serve a single listing page for `config` naming `repos`, and each
    /// repo's recipe where one is given.
    pub fn with_registry(mut self, config: &Config, repos: &[(&str, Option<&str>)]) -> Self {
        let listing: Vec<serde_json::Value> = repos
            .iter()
            .map(|(name, _)| {
                serde_json::json!({
                    "name": name,
                    "html_url": repo_url(name),
                    "fork": false,
                })
            })
            .collect();
        let body = serde_json::to_vec(&listing).unwrap();
        self = self.with(&config.listing_url(1), &body);

        for (name, recipe) in repos {
            if let Some(recipe) = recipe {
                self = self.with(&recipe_url(name), recipe.as_bytes());
            }
        }
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetch for CannedFetch {
    fn get(&self, url: &str) -> Result<FetchResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(self
            .responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchResponse::status(404)))
    }
}

pub fn repo_url(name: &str) -> String {
    format!("https://example.com/MiSTer-devel/{}", name)
}

pub fn recipe_url(name: &str) -> String {
    format!("{}/raw/master/releases/build_rom.ini", repo_url(name))
}

/// Config pointing at a fake registry and a snapshot inside `dir`.
pub fn test_config(dir: &Path) -> Config {
    Config {
        snapshot_path: dir.join("definitions.toml"),
        api_host: "https://api.example.com".to_string(),
        ..Config::default()
    }
}
