//! SQL schema generation from Smart Data Model `model.yaml` files
//!
//! The generator takes a GitHub blob URL pointing at a `model.yaml`, downloads
//! the raw file and renders one `CREATE TABLE` statement for the entity type
//! it describes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml_ng::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

static GITHUB_BLOB_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://github\.com/([^/\s]+)/([^/\s]+)/blob/([^/\s]+)/(\S+)$")
        .expect("GitHub blob URL pattern is valid")
});

/// True for `https://github.com/<owner>/<repo>/blob/<ref>/<path>`
pub fn is_valid_github_url(url: &str) -> bool {
    GITHUB_BLOB_URL.is_match(url)
}

/// The `raw.githubusercontent.com` URL serving the file behind a blob URL
pub fn raw_content_url(url: &str) -> Option<String> {
    let caps = GITHUB_BLOB_URL.captures(url)?;
    Some(format!(
        "https://raw.githubusercontent.com/{}/{}/{}/{}",
        &caps[1], &caps[2], &caps[3], &caps[4]
    ))
}

/// Trait for SQL schema generators
#[async_trait]
pub trait SchemaGenerator: Send + Sync {
    /// Produce the SQL schema for the model at `model_url`
    async fn generate(&self, model_url: &str) -> Result<String>;
}

/// Downloads `model.yaml` from GitHub and converts it to SQL
pub struct ModelYamlGenerator {
    client: reqwest::Client,
}

impl ModelYamlGenerator {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sdm-schema/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SchemaGenerator for ModelYamlGenerator {
    async fn generate(&self, model_url: &str) -> Result<String> {
        let raw_url = raw_content_url(model_url)
            .with_context(|| format!("Not a GitHub file URL: {model_url}"))?;

        debug!("Downloading model definition from {}", raw_url);

        let response = self
            .client
            .get(&raw_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch model definition from {raw_url}"))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to fetch model definition: HTTP {} from {}",
                response.status(),
                raw_url
            );
        }

        let content = response
            .text()
            .await
            .context("Failed to read response body")?;

        sql_from_model_yaml(&content)
    }
}

/// Render the `CREATE TABLE` statement for a `model.yaml` document
///
/// The first top-level key is the entity type. Its `properties`, plus those of
/// any inline `allOf` member, become columns in document order.
pub fn sql_from_model_yaml(yaml: &str) -> Result<String> {
    let doc: Value = serde_yaml_ng::from_str(yaml).context("Failed to parse model.yaml")?;

    let (name, model) = doc
        .as_mapping()
        .and_then(|m| m.iter().next())
        .context("model.yaml must start with the entity type definition")?;
    let entity_type = name
        .as_str()
        .context("Entity type name must be a string")?;

    let mut columns: Vec<(&str, &Value)> = Vec::new();
    collect_properties(model, &mut columns);
    for member in model
        .get("allOf")
        .and_then(Value::as_sequence)
        .into_iter()
        .flatten()
    {
        collect_properties(member, &mut columns);
    }

    if columns.is_empty() {
        anyhow::bail!("Entity type '{}' defines no properties", entity_type);
    }

    let required: HashSet<&str> = model
        .get("required")
        .and_then(Value::as_sequence)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect();

    let definitions: Vec<String> = columns
        .iter()
        .map(|(column, schema)| {
            if *column == "id" {
                format!("    {} TEXT PRIMARY KEY", quote_identifier(column))
            } else if required.contains(column) {
                format!("    {} {} NOT NULL", quote_identifier(column), column_type(schema))
            } else {
                format!("    {} {}", quote_identifier(column), column_type(schema))
            }
        })
        .collect();

    Ok(format!(
        "CREATE TABLE {} (\n{}\n);",
        quote_identifier(entity_type),
        definitions.join(",\n")
    ))
}

fn collect_properties<'a>(schema: &'a Value, columns: &mut Vec<(&'a str, &'a Value)>) {
    let Some(properties) = schema.get("properties").and_then(Value::as_mapping) else {
        return;
    };

    for (name, definition) in properties {
        if let Some(name) = name.as_str() {
            if !columns.iter().any(|(existing, _)| *existing == name) {
                columns.push((name, definition));
            }
        }
    }
}

fn column_type(schema: &Value) -> &'static str {
    let kind = schema.get("type").and_then(Value::as_str);
    let format = schema.get("format").and_then(Value::as_str);

    match (kind, format) {
        (Some("string"), Some("date-time")) => "TIMESTAMP",
        (Some("string"), Some("date")) => "DATE",
        (Some("string"), _) => "TEXT",
        (Some("integer"), _) => "INTEGER",
        (Some("number"), _) => "NUMERIC",
        (Some("boolean"), _) => "BOOLEAN",
        _ => "JSONB",
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
