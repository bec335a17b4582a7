// src/error.rs

//! Error types shared across the ROM builder library

use thiserror::Error;

/// Result type for rombuilder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by recipe parsing, definition sync and ROM assembly
#[derive(Error, Debug)]
pub enum Error {
    /// A recipe could not be parsed into key/value pairs
    #[error("malformed recipe: {0}")]
    MalformedRecipe(String),

    /// No definition matches the requested archive base name
    #[error("ROM definition not found for '{0}'")]
    RecipeNotFound(String),

    /// A declared input is absent from the source archive
    #[error("Missing '{member}' in '{archive}'")]
    MissingArchiveMember { member: String, archive: String },

    /// A declared remote input could not be retrieved
    #[error("Failed to download '{url}': {reason}")]
    RemoteFetchFailed { url: String, reason: String },

    /// Assembled image digest differs from the recipe
    #[error("MD5 mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Operation was cancelled through its cancel flag
    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("download error: {0}")]
    DownloadError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("initialization error: {0}")]
    InitError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
