//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;

use anyhow::{Context, Result};
use url::Url;

/// Extract the lower-cased hostname from a URL
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed = Url::parse(url).context("Invalid URL")?;

    parsed
        .host_str()
        .map(|s| s.to_ascii_lowercase())
        .context("No host in URL")
}

/// Grouping key for a feed URL: its hostname, or the URL itself when no host can be extracted
pub fn host_key(url: &str) -> String {
    extract_domain(url).unwrap_or_else(|_| url.to_string())
}
