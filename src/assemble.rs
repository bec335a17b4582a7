// src/assemble.rs

//! ROM image assembly
//!
//! Concatenates the inputs a recipe lists, in order, into one output image
//! while feeding the same bytes into a running MD5. Archive members are read
//! from the MAME zip; remote inputs are downloaded.
//!
//! Failure handling:
//! - A missing member or failed download aborts the build and removes the
//!   partially written image before returning
//! - A checksum mismatch is only a warning; the image is kept

use crate::config::Config;
use crate::definitions::DefinitionStore;
use crate::error::{Error, Result};
use crate::hash::{self, Hash, Hasher};
use crate::progress::{AssemblyEvent, ProgressObserver};
use crate::recipe::{InputSpec, Recipe};
use crate::repository::{Fetch, FetchResponse, HttpClient};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

/// Largest up-front buffer reserved for one archive member
const MAX_MEMBER_PREALLOC: u64 = 16 * 1024 * 1024;

/// Severity of an assembly result, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutcomeKind {
    Success,
    Warning,
    Error,
}

impl OutcomeKind {
    /// Process exit code for this kind
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Error => 1,
            Self::Warning => 2,
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "Success",
            Self::Warning => "Warning",
            Self::Error => "Error",
        };
        f.write_str(label)
    }
}

/// Classified result of one assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Image written (and verified, when the recipe declares a checksum)
    Success(String),
    /// Image written but its checksum does not match the recipe
    Warning(String),
    /// Image not written; nothing is left on disk
    Error(String),
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::Warning(_) => OutcomeKind::Warning,
            Self::Error(_) => OutcomeKind::Error,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Success(msg) | Self::Warning(msg) | Self::Error(msg) => msg,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.kind(), self.message())
    }
}

/// Exit code for a batch: the worst outcome wins
pub fn batch_exit_code<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> i32 {
    outcomes
        .into_iter()
        .map(Outcome::kind)
        .max()
        .unwrap_or(OutcomeKind::Success)
        .exit_code()
}

/// Build `output_path` from `archive_path` following `recipe`
///
/// `fetcher` is only used for remote inputs.
pub fn assemble(
    archive_path: &Path,
    recipe: &Recipe,
    output_path: &Path,
    fetcher: &dyn Fetch,
    observer: &dyn ProgressObserver,
) -> Outcome {
    let display_name = output_display_name(output_path);

    match build_image(archive_path, recipe, output_path, fetcher, observer) {
        Ok(digest) => match recipe.expected_md5.as_deref() {
            None => {
                info!("No checksum declared for '{}', output not verified", display_name);
                Outcome::Success(format!("'{}' created (no checksum to verify)", display_name))
            }
            Some(expected) => match hash::verify(&digest, expected) {
                Ok(()) => {
                    info!("MD5 verified for '{}'", output_path.display());
                    Outcome::Success(format!("'{}' created successfully", display_name))
                }
                Err(mismatch) => {
                    error!("'{}': {}", display_name, mismatch);
                    Outcome::Warning(format!(
                        "MD5 mismatch for '{}'. The ROM may still work but was not tested.",
                        display_name
                    ))
                }
            },
        },
        Err(e) => {
            error!("Failed to build '{}': {}", display_name, e);
            Outcome::Error(e.to_string())
        }
    }
}

/// [`assemble`] with the default HTTP client
///
/// The client is only built when the recipe has remote inputs.
pub fn assemble_with_client(
    archive_path: &Path,
    recipe: &Recipe,
    output_path: &Path,
    config: &Config,
    observer: &dyn ProgressObserver,
) -> Outcome {
    if !recipe.has_remote_inputs() {
        return assemble(archive_path, recipe, output_path, &LocalOnly, observer);
    }

    match HttpClient::new(config) {
        Ok(client) => assemble(archive_path, recipe, output_path, &client, observer),
        Err(e) => {
            error!("{}", e);
            Outcome::Error(e.to_string())
        }
    }
}

/// Look up the recipe for `archive_path` and build it
///
/// Without an explicit `output_path` the image is written to the recipe's
/// `ofile` inside `output_dir`.
pub fn assemble_from_store(
    store: &DefinitionStore,
    archive_path: &Path,
    output_path: Option<&Path>,
    output_dir: &Path,
    fetcher: &dyn Fetch,
    observer: &dyn ProgressObserver,
) -> Outcome {
    let recipe = match store.lookup_archive(archive_path) {
        Ok(recipe) => recipe,
        Err(e) => {
            error!("{}", e);
            return Outcome::Error(e.to_string());
        }
    };

    let output_path = match output_path {
        Some(path) => path.to_path_buf(),
        None => match default_output_path(recipe, output_dir) {
            Ok(path) => path,
            Err(e) => return Outcome::Error(e.to_string()),
        },
    };

    assemble(archive_path, recipe, &output_path, fetcher, observer)
}

/// Where a recipe's image goes by default: its `ofile` inside `output_dir`
///
/// Only the final path component of `ofile` is used so a recipe cannot
/// direct output outside `output_dir`.
pub fn default_output_path(recipe: &Recipe, output_dir: &Path) -> Result<PathBuf> {
    let output_file = recipe.output_file.as_deref().ok_or_else(|| {
        Error::MalformedRecipe(format!("'{}' declares no output file", recipe.archive_name))
    })?;
    let file_name = Path::new(output_file).file_name().ok_or_else(|| {
        Error::MalformedRecipe(format!(
            "'{}' has unusable output file name '{}'",
            recipe.archive_name, output_file
        ))
    })?;
    Ok(output_dir.join(file_name))
}

fn build_image(
    archive_path: &Path,
    recipe: &Recipe,
    output_path: &Path,
    fetcher: &dyn Fetch,
    observer: &dyn ProgressObserver,
) -> Result<Hash> {
    debug!("Opening Zip Archive: {}", archive_path.display());
    let file = File::open(archive_path).map_err(|e| {
        Error::IoError(format!("Failed to open archive {}: {}", archive_path.display(), e))
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| {
        Error::ParseError(format!("Failed to read zip archive {}: {}", archive_path.display(), e))
    })?;

    if is_same_file(archive_path, output_path) {
        return Err(Error::IoError(format!(
            "Output {} would overwrite the source archive",
            output_path.display()
        )));
    }

    debug!("Writing output rom: {}", output_display_name(output_path));
    let output = File::create(output_path).map_err(|e| {
        Error::IoError(format!("Failed to create {}: {}", output_path.display(), e))
    })?;

    let result = write_inputs(&mut archive, archive_path, recipe, output, fetcher, observer);
    if result.is_err() {
        remove_partial(output_path);
    }
    result
}

fn write_inputs<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    archive_path: &Path,
    recipe: &Recipe,
    output: File,
    fetcher: &dyn Fetch,
    observer: &dyn ProgressObserver,
) -> Result<Hash> {
    let mut writer = BufWriter::new(output);
    let mut hasher = Hasher::new();
    let total = recipe.inputs.len();

    for (index, input) in recipe.inputs.iter().enumerate() {
        let content = match input {
            InputSpec::RemoteFile { url } => fetch_remote(fetcher, url)?,
            InputSpec::ArchiveMember { name } => read_member(archive, archive_path, name)?,
        };

        hasher.update(&content);
        writer.write_all(&content)?;
        debug!("Added '{}' ({} bytes)", input, content.len());

        observer.notify(
            AssemblyEvent::InputAdded {
                index: index + 1,
                total,
                input: input.to_string(),
                bytes: content.len() as u64,
            }
            .into(),
        );
    }

    let file = writer
        .into_inner()
        .map_err(|e| Error::IoError(format!("Failed to flush output: {}", e.error())))?;
    file.sync_all()?;

    Ok(hasher.finalize())
}

fn fetch_remote(fetcher: &dyn Fetch, url: &str) -> Result<Vec<u8>> {
    let response = fetcher.get(url).map_err(|e| Error::RemoteFetchFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !response.is_success() {
        return Err(Error::RemoteFetchFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status),
        });
    }
    Ok(response.body)
}

fn read_member<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    archive_path: &Path,
    name: &str,
) -> Result<Vec<u8>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            error!("Missing '{}' in '{}'", name, archive_path.display());
            return Err(Error::MissingArchiveMember {
                member: name.to_string(),
                archive: archive_path.display().to_string(),
            });
        }
        Err(e) => {
            return Err(Error::ParseError(format!(
                "Failed to read '{}' from {}: {}",
                name,
                archive_path.display(),
                e
            )));
        }
    };

    let mut content = Vec::with_capacity(initial_capacity(entry.size()));
    entry.read_to_end(&mut content).map_err(|e| {
        Error::IoError(format!(
            "Failed to extract '{}' from {}: {}",
            name,
            archive_path.display(),
            e
        ))
    })?;
    Ok(content)
}

/// Fetcher for recipes without remote inputs
struct LocalOnly;

impl Fetch for LocalOnly {
    fn get(&self, url: &str) -> Result<FetchResponse> {
        Err(Error::DownloadError(format!("no HTTP client configured for {}", url)))
    }
}

/// Buffer reservation for a member; header sizes are not trusted beyond a cap
fn initial_capacity(declared_size: u64) -> usize {
    declared_size.min(MAX_MEMBER_PREALLOC) as usize
}

fn remove_partial(output_path: &Path) {
    info!("Removing failed rom '{}'", output_path.display());
    if let Err(e) = std::fs::remove_file(output_path) {
        warn!("Failed to remove {}: {}", output_path.display(), e);
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn output_display_name(output_path: &Path) -> String {
    output_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| output_path.display().to_string())
}
