//! Tracing setup
//!
//! Console output always goes to stderr so `run` and `sql` keep stdout for
//! their result. When `logger.path` is set, the same records are appended to
//! that file as well.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use sdm_core::config::LoggerConfig;

fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber
pub fn initialize_tracing(directive: &str, logger: &LoggerConfig) -> Result<()> {
    let console_layer = if logger.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter(directive))
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter(directive))
            .boxed()
    };

    let file_layer = match &logger.path {
        Some(path) => Some(file_layer(path, logger.json)?.with_filter(env_filter(directive))),
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = &logger.path {
        tracing::debug!("Logging to {}", path.display());
    }
    Ok(())
}

/// Layer appending records to `path`, creating its directory if needed
pub fn file_layer<S>(path: &Path, json: bool) -> Result<Box<dyn Layer<S> + Send + Sync>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(log_file)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(log_file)
            .with_target(true)
            .boxed()
    };
    Ok(layer)
}
