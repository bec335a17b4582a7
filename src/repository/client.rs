// src/repository/client.rs

//! HTTP client for registry operations
//!
//! Provides a wrapper around reqwest with retry support for fetching the
//! source listing, recipes and remote ROM inputs. Callers work against the
//! [`Fetch`] trait so the transport can be swapped out.

use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum attempts for requests that fail at the transport level
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// A completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as UTF-8 text
    pub fn into_text(self, url: &str) -> Result<String> {
        String::from_utf8(self.body).map_err(|e| {
            Error::ParseError(format!("Invalid UTF-8 in response from {}: {}", url, e))
        })
    }
}

/// Transport used by the registry and the assembly engine
///
/// `get` returns `Err` only when no response was received; HTTP error
/// statuses come back as a [`FetchResponse`] for the caller to classify.
pub trait Fetch: Send + Sync {
    fn get(&self, url: &str) -> Result<FetchResponse>;

    /// Fetch a URL, treating any non-success status as an error
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url)?;
        if !response.is_success() {
            return Err(Error::DownloadError(format!(
                "HTTP {} from {}",
                response.status, url
            )));
        }
        Ok(response.body)
    }
}

/// HTTP client wrapper with retry support
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    /// Create a client using the configured timeout and user agent
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }
}

impl Fetch for HttpClient {
    fn get(&self, url: &str) -> Result<FetchResponse> {
        debug!("GET {}", url);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).send() {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.bytes().map_err(|e| {
                        Error::DownloadError(format!("Failed to read response from {}: {e}", url))
                    })?;
                    return Ok(FetchResponse {
                        status,
                        body: body.to_vec(),
                    });
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "Failed to fetch {} after {attempt} attempts: {e}",
                            url
                        )));
                    }
                    warn!("Request attempt {} for {} failed: {}, retrying...", attempt, url, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}
