// src/hash.rs

//! Running MD5 digests for assembled ROM images
//!
//! Recipes publish the expected image checksum as a lowercase hex MD5
//! (`ofileMd5sumValid`). The assembly engine feeds every input into a
//! [`Hasher`] in recipe order, so the digest covers the whole concatenation.

use crate::error::{Error, Result};
use md5::{Digest, Md5};
use std::fmt;

/// An MD5 digest as lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    value: String,
}

impl Hash {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Compare against a declared digest, ignoring case and surrounding whitespace
    pub fn matches(&self, expected: &str) -> bool {
        self.value == expected.trim().to_lowercase()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Incremental MD5 hasher
#[derive(Default)]
pub struct Hasher {
    state: Md5,
}

impl Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the hasher with more data
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Finalize and return the digest
    pub fn finalize(self) -> Hash {
        Hash {
            value: format!("{:x}", self.state.finalize()),
        }
    }
}

/// Compute the MD5 of a byte slice
pub fn md5_bytes(data: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verify a computed digest against the value a recipe declares
pub fn verify(actual: &Hash, expected: &str) -> Result<()> {
    if actual.matches(expected) {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            expected: expected.trim().to_lowercase(),
            actual: actual.value.clone(),
        })
    }
}
