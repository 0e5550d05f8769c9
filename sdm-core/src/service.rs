//! Request-level orchestration over the catalog cache and schema generator
//!
//! The HTTP façade and the one-shot CLI commands both go through
//! [`LookupService`], which maps lower-level failures onto the
//! client-facing [`ServiceError`] taxonomy.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::catalog::{CatalogCache, LookupError, LookupResult};
use crate::schema::{is_valid_github_url, SchemaGenerator};

/// Errors surfaced to clients
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ServiceError {
    /// The request payload was missing or malformed
    #[error("{0}")]
    InvalidRequest(String),

    /// The entity type is not published in the catalogs
    #[error("Unable to find the Entity Type: {entity_type}")]
    NotFound { entity_type: String },

    /// The model URL is not a GitHub file URL
    #[error("Invalid GitHub URL: {url}")]
    InvalidUrl { url: String },

    /// The schema generator failed
    #[error("Unable to generate the SQL schema: {0}")]
    Generation(String),

    /// The catalog cache went away
    #[error("Catalog data is not available")]
    Unavailable,
}

impl From<LookupError> for ServiceError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound { entity_type } => ServiceError::NotFound { entity_type },
            LookupError::Closed => ServiceError::Unavailable,
        }
    }
}

/// Entity lookups and SQL schema generation
pub struct LookupService {
    cache: Arc<CatalogCache>,
    generator: Arc<dyn SchemaGenerator>,
}

impl LookupService {
    pub fn new(cache: Arc<CatalogCache>, generator: Arc<dyn SchemaGenerator>) -> Self {
        Self { cache, generator }
    }

    /// The cache backing entity lookups
    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    /// Resolve an entity type to its repository, YAML and JSON Schema links
    pub async fn entity_links(&self, entity_type: &str) -> Result<LookupResult, ServiceError> {
        if entity_type.trim().is_empty() {
            return Err(ServiceError::InvalidRequest(
                "The Entity Type must not be empty".to_string(),
            ));
        }

        debug!("Request obtain the JSON Schema of the Entity Type: \"{}\"", entity_type);

        match self.cache.lookup(entity_type).await {
            Ok(links) => {
                info!("JSON Schema obtained successfully: {:?}", links);
                Ok(links)
            }
            Err(e) => {
                error!("{}", e);
                Err(e.into())
            }
        }
    }

    /// Generate the SQL schema for the `model.yaml` at `url`
    pub async fn sql_schema(&self, url: &str) -> Result<String, ServiceError> {
        if !is_valid_github_url(url) {
            error!("Invalid GitHub URL: {}", url);
            return Err(ServiceError::InvalidUrl {
                url: url.to_string(),
            });
        }

        self.generator.generate(url).await.map_err(|e| {
            error!("SQL schema generation failed for {}: {:#}", url, e);
            ServiceError::Generation(format!("{e:#}"))
        })
    }
}
