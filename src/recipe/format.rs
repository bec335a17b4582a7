// src/recipe/format.rs

//! Recipe data types
//!
//! A recipe (`build_rom.ini`) describes how to turn one MAME zip archive into
//! one MiSTer ROM image: the inputs to concatenate, in order, and the digest
//! the result should have.

use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// One input of a recipe, in the byte order of the assembled image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    /// A member file of the source zip archive
    ArchiveMember { name: String },
    /// A file hosted outside the archive, fetched over HTTP(S)
    RemoteFile { url: String },
}

impl InputSpec {
    /// Classify a raw token: HTTP(S) URLs are remote, everything else is an
    /// archive member name.
    pub fn from_token(token: &str) -> Self {
        if is_remote(token) {
            Self::RemoteFile {
                url: token.to_string(),
            }
        } else {
            Self::ArchiveMember {
                name: token.to_string(),
            }
        }
    }

    /// The raw token as it appears in a recipe or snapshot
    pub fn as_token(&self) -> &str {
        match self {
            Self::ArchiveMember { name } => name,
            Self::RemoteFile { url } => url,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteFile { .. })
    }
}

impl fmt::Display for InputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

fn is_remote(token: &str) -> bool {
    Url::parse(token)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// A parsed ROM build recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    /// Canonical source archive base name (`zip=`); the definition key
    pub archive_name: String,
    /// Default output image name (`ofile=`); required only when building
    /// without an explicit output path
    pub output_file: Option<String>,
    /// Inputs in concatenation order; never empty
    pub inputs: Vec<InputSpec>,
    /// Expected lowercase hex MD5 of the image (`ofileMd5sumValid=`)
    pub expected_md5: Option<String>,
    /// Web location of the registry source that published the recipe
    pub source_url: Option<String>,
    /// Any other `key=value` pairs, verbatim
    pub attributes: BTreeMap<String, String>,
}

impl Recipe {
    /// Key under which this recipe is stored
    pub fn key(&self) -> &str {
        &self.archive_name
    }

    /// Whether any input must be downloaded
    pub fn has_remote_inputs(&self) -> bool {
        self.inputs.iter().any(InputSpec::is_remote)
    }

    /// Title of the arcade core, derived from the source repository name
    pub fn core_name(&self) -> Option<String> {
        let url = self.source_url.as_deref()?;
        let repo = url.trim_end_matches('/').rsplit('/').next()?;
        Some(crate::repository::core_name_from_repo(repo))
    }
}
