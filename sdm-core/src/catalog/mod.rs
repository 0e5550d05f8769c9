//! Smart Data Models catalog cache
//!
//! This module keeps an in-memory copy of the two public catalogs that
//! describe every Smart Data Model and answers entity-type lookups from it.
//!
//! # Overview
//!
//! - The **official list** maps each data-model repository to the entity
//!   types it hosts.
//! - The **metadata catalog** maps each entity type to the URLs of its
//!   `model.yaml` and JSON Schema.
//!
//! # Architecture
//!
//! ```text
//! official_list_data_models.json   datamodels_metadata.json
//!               │                            │
//!               └──────────┬─────────────────┘
//!                          ▼
//!                  CatalogSource::fetch      (one GET per catalog)
//!                          │
//!                          ▼
//!                  CatalogCache refresh loop (every 12h, refetch after 7 days)
//!                          │  publishes Arc<CatalogSnapshot>
//!                          ▼
//!                  CatalogCache::lookup      (any number of readers)
//! ```

mod cache;
mod error;
mod fetcher;
mod types;

pub use cache::{needs_refresh, CatalogCache, RefreshOutcome};
pub use error::{FetchError, LookupError};
pub use fetcher::{CatalogSource, HttpCatalogFetcher};
pub use types::{
    repository_tree_link, CatalogSnapshot, LookupResult, ModelMetadataEntry, OfficialList,
    OfficialListEntry,
};
