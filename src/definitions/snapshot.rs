// src/definitions/snapshot.rs

//! On-disk definition snapshot
//!
//! The snapshot is a TOML document with one table per archive base name:
//!
//! ```toml
//! ["dkong.zip"]
//! ofile = "a.dkong.rom"
//! ofileMd5sumValid = "..."
//! html_url = "https://github.com/MiSTer-devel/Arcade-DonkeyKong_MiSTer"
//! ifiles = "c_5et_g.bin c_5ct_g.bin 'name with space.bin'"
//! ```
//!
//! `ifiles` holds individually shell-quoted tokens so names with spaces
//! survive the round trip; it is re-tokenized without path rewriting.

use crate::error::{Error, Result};
use crate::recipe::{InputSpec, Recipe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ofile: Option<String>,
    #[serde(rename = "ofileMd5sumValid", default, skip_serializing_if = "Option::is_none")]
    md5: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    html_url: Option<String>,
    #[serde(flatten)]
    attributes: BTreeMap<String, String>,
    ifiles: String,
}

impl SnapshotEntry {
    fn from_recipe(recipe: &Recipe) -> Result<Self> {
        let ifiles = shlex::try_join(recipe.inputs.iter().map(InputSpec::as_token)).map_err(|e| {
            Error::ParseError(format!(
                "cannot quote inputs of '{}': {}",
                recipe.archive_name, e
            ))
        })?;

        Ok(Self {
            ofile: recipe.output_file.clone(),
            md5: recipe.expected_md5.clone(),
            html_url: recipe.source_url.clone(),
            attributes: recipe.attributes.clone(),
            ifiles,
        })
    }

    fn into_recipe(self, archive_name: String) -> Result<Recipe> {
        let inputs: Vec<InputSpec> = shlex::split(&self.ifiles)
            .ok_or_else(|| {
                Error::ParseError(format!(
                    "definition '{}' has unbalanced quoting in ifiles",
                    archive_name
                ))
            })?
            .iter()
            .map(|token| InputSpec::from_token(token))
            .collect();

        if inputs.is_empty() {
            return Err(Error::ParseError(format!(
                "definition '{}' lists no input files",
                archive_name
            )));
        }

        Ok(Recipe {
            archive_name,
            output_file: self.ofile,
            inputs,
            expected_md5: self.md5,
            source_url: self.html_url,
            attributes: self.attributes,
        })
    }
}

/// Render recipes as snapshot text
pub fn to_snapshot_string<'a>(recipes: impl IntoIterator<Item = &'a Recipe>) -> Result<String> {
    let mut document = BTreeMap::new();
    for recipe in recipes {
        document.insert(recipe.archive_name.clone(), SnapshotEntry::from_recipe(recipe)?);
    }

    toml::to_string(&document)
        .map_err(|e| Error::ParseError(format!("Failed to serialize definitions: {}", e)))
}

/// Parse snapshot text into recipes keyed by archive base name
pub fn from_snapshot_str(content: &str) -> Result<BTreeMap<String, Recipe>> {
    let document: BTreeMap<String, SnapshotEntry> = toml::from_str(content)
        .map_err(|e| Error::ParseError(format!("Invalid definition snapshot: {}", e)))?;

    document
        .into_iter()
        .map(|(archive, entry)| {
            let recipe = entry.into_recipe(archive.clone())?;
            Ok((archive, recipe))
        })
        .collect()
}

/// Atomically replace the snapshot at `path`
///
/// Content goes to a temp file in the same directory which is then renamed
/// over the destination, so readers never see a half-written snapshot.
pub fn write_snapshot(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| {
        Error::IoError(format!("Failed to create directory {}: {e}", dir.display()))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        Error::IoError(format!("Failed to create temp file in {}: {e}", dir.display()))
    })?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| {
        Error::IoError(format!("Failed to move snapshot to {}: {}", path.display(), e.error))
    })?;

    debug!("Wrote definition snapshot {}", path.display());
    Ok(())
}
