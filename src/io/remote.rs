//! Fetching CSV documents over HTTP(S) or from the local filesystem.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use reqwest::{blocking::Client, header};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Request for {url} failed with status {status}")]
    StatusError { url: String, status: u16 },
}

/// Whether `source` should be fetched over the network.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Blocking downloader for small tabular documents.
pub struct CsvDownloader {
    /// HTTP client
    client: Client,
}

impl CsvDownloader {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(concat!("rnaseq-explorer/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(CsvDownloader { client })
    }

    /// Downloads `url` and returns the body as text.
    pub fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        info!("Fetching {}", url);
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(FetchError::StatusError {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let body = response.text()?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// Reads `source` as a URL when it looks like one, otherwise as a path.
    pub fn read_source(&self, source: &str) -> Result<String, FetchError> {
        if is_remote(source) {
            self.fetch_text(source)
        } else {
            info!("Reading {}", source);
            Ok(fs::read_to_string(Path::new(source))?)
        }
    }
}
