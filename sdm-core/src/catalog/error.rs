//! Catalog error types

use thiserror::Error;

/// Failure of a single catalog download
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request did not complete within the fetch timeout
    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    /// DNS, TCP or TLS failure before a response arrived
    #[error("Connection to {url} failed: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// The server answered with a non-success status
    #[error("HTTP {code} from {url}")]
    HttpStatus { url: String, code: u16 },

    /// The body was not JSON, or not the expected catalog shape
    #[error("Failed to decode catalog from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Failure of an entity-type lookup
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LookupError {
    /// The entity type is missing from the metadata catalog or the official list
    #[error("Unable to find the Entity Type: {entity_type}")]
    NotFound { entity_type: String },

    /// The cache was dropped while a reader was waiting for data
    #[error("Catalog cache is no longer available")]
    Closed,
}
