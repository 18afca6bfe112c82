//! Fetching datasets and pointer files over HTTP.
//!
//! Only available with the `download` feature. The upstream publishes a small
//! pointer file (`const bulatestdataurl = '...'`) that names the latest
//! dataset; [`Downloader::fetch_latest`] follows it. Each request is made
//! once: failures surface as [`UlamError::DownloadFailed`] and recovery is
//! left to the session's fallback.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::{Result, UlamError};
use crate::loader::{parse_dataset, parse_pointer};

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for HTTP downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl DownloadConfig {
    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Blocking HTTP client for datasets and pointer files.
#[derive(Debug)]
pub struct Downloader {
    client: Client,
    config: DownloadConfig,
}

impl Downloader {
    /// Create a new downloader with the given configuration.
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UlamError::DownloadFailed {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Fetch the raw bytes at `url`.
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "downloading");
        let failed = |reason: String| UlamError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().map_err(|e| failed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Download and decode the dataset at `url`.
    pub fn fetch_dataset(&self, url: &str) -> Result<Dataset> {
        parse_dataset(&self.fetch_bytes(url)?)
    }

    /// Read the pointer file at `pointer_url` and return the dataset URL it names.
    pub fn resolve_pointer(&self, pointer_url: &str) -> Result<String> {
        let bytes = self.fetch_bytes(pointer_url)?;
        parse_pointer(&String::from_utf8_lossy(&bytes))
    }

    /// Follow the pointer file and download the dataset it names.
    pub fn fetch_latest(&self, pointer_url: &str) -> Result<Dataset> {
        let url = self.resolve_pointer(pointer_url)?;
        self.fetch_dataset(&url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_config_builder() {
        let config = DownloadConfig::default().with_timeout(5);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(DownloadConfig::default().timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_unreachable_url_fails() {
        let downloader = Downloader::new(DownloadConfig::default().with_timeout(2)).unwrap();
        let result = downloader.fetch_bytes("http://127.0.0.1:9/bu.js.gz");
        assert!(matches!(result, Err(UlamError::DownloadFailed { .. })));
    }
}
