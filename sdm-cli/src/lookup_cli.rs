//! One-shot `run` and `sql` commands
//!
//! Both build the same service the HTTP façade uses, answer a single request
//! and print the result to stdout.

use anyhow::{anyhow, Result};
use std::time::Duration;
use tracing::error;

use sdm_core::config::ServiceConfig;

use crate::server::build_service;

/// Look up an entity type and print its links as JSON
pub async fn run(config: &ServiceConfig, entity_type: &str, wait_seconds: u64) -> Result<()> {
    let service = build_service(config)?;
    service.cache().start()?;

    let outcome = tokio::time::timeout(
        Duration::from_secs(wait_seconds),
        service.entity_links(entity_type),
    )
    .await;

    service.cache().stop().await;

    match outcome {
        Err(_) => Err(anyhow!(
            "Catalog data did not arrive within {wait_seconds} seconds"
        )),
        Ok(Err(e)) => {
            error!("Unable to find the Entity Name: {}", entity_type);
            Err(e.into())
        }
        Ok(Ok(links)) => {
            println!("{}", serde_json::to_string_pretty(&links)?);
            Ok(())
        }
    }
}

/// Generate the SQL schema for a GitHub model URL and print it
pub async fn sql(config: &ServiceConfig, url: &str) -> Result<()> {
    let service = build_service(config)?;
    let schema = service.sql_schema(url).await?;

    println!("{schema}");
    Ok(())
}
