//! Remote catalog download
//!
//! A [`CatalogSource`] performs exactly one bounded GET per call and hands back
//! the decoded JSON document. Retrying is the refresh loop's business.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::FetchError;

/// Trait for anything that can deliver a catalog document
///
/// The HTTP implementation is used in production; tests plug in in-memory
/// sources to drive the cache deterministically.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch and JSON-decode the document at `url`
    async fn fetch(&self, url: &str) -> std::result::Result<serde_json::Value, FetchError>;
}

/// Fetches catalogs over HTTP with a short per-request timeout
pub struct HttpCatalogFetcher {
    client: reqwest::Client,
}

impl HttpCatalogFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sdm-schema/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::ConnectionFailed {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<serde_json::Value, FetchError> {
        debug!("Fetching catalog from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| transport_error(url, e))?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
