// src/repository/mod.rs

//! Remote registry access
//!
//! This module provides functionality for:
//! - Fetching URLs with retry over a swappable transport
//! - Enumerating recipe-publishing sources page by page
//! - Fetching each source's `build_rom.ini`

mod client;
mod registry;

pub use client::{Fetch, FetchResponse, HttpClient};
pub use registry::{core_name_from_repo, Registry, Source, SourceListing};
