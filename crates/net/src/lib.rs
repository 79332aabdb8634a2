#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for modinstall
//!
//! This crate downloads package archives over HTTP with retries, a bounded
//! overall deadline and an atomic write to the destination path.

mod client;
mod fetcher;

pub use client::{NetClient, NetConfig};
pub use fetcher::{ArchiveFetcher, FetchedArchive, HttpFetcher};

use modinstall_errors::{Error, NetworkError};
use url::Url;

/// Parse and validate a URL
///
/// # Errors
///
/// Returns an error if the URL string is malformed or does not use http(s).
pub fn parse_url(url: &str) -> Result<Url, Error> {
    let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(NetworkError::InvalidUrl(format!("unsupported scheme: {other}")).into()),
    }
}
