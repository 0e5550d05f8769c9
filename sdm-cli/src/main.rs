//! SDM schema service - entity links and SQL schemas for Smart Data Models
//!
//! Main entry point: one-shot lookups, one-shot SQL generation, or the HTTP
//! service backed by the background catalog cache.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use sdm_core::config::ServiceConfig;

mod handlers;
mod logging;
mod lookup_cli;
mod server;

use server::ServiceKind;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "sdm-schema",
    about = "Recover the links and SQL schema of Smart Data Models based on the Entity Type",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level (defaults to the config file's logger.level)
    #[clap(long, global = true)]
    log_level: Option<LogLevel>,

    /// Configuration file
    #[clap(long, default_value = "config.json", global = true)]
    config: PathBuf,
}

#[derive(Parser, Debug)]
enum Command {
    /// Look up the repository, YAML and JSON Schema links of an Entity Type
    Run {
        /// Entity Type to obtain the corresponding JSON Schema
        #[clap(short = 'e', long = "entity_type", alias = "entity-type")]
        entity_type: String,

        /// Seconds to wait for the catalogs to download
        #[clap(long, default_value_t = 30)]
        wait_seconds: u64,
    },

    /// Generate the SQL schema of the model.yaml behind a GitHub URL
    Sql {
        /// GitHub URL of the model.yaml, e.g. https://github.com/<owner>/<repo>/blob/<ref>/<path>
        #[clap(short, long)]
        url: String,
    },

    /// Launch the HTTP service
    Server {
        /// Launch the server in the corresponding host
        #[clap(long)]
        host: Option<String>,

        /// Launch the server in the corresponding port
        #[clap(short, long, value_parser = clap::value_parser!(u16).range(2..65535))]
        port: Option<u16>,

        /// Which POST /entity flavour to serve
        #[clap(long, value_enum, default_value = "links")]
        service: ServiceKind,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ServiceConfig::load_from_path(&cli.config)?;

    let directive = cli
        .log_level
        .as_ref()
        .map(|level| level.to_filter_directive().to_string())
        .unwrap_or_else(|| config.logger.level.clone());
    logging::initialize_tracing(&directive, &config.logger)?;

    match cli.command {
        Command::Run {
            entity_type,
            wait_seconds,
        } => lookup_cli::run(&config, &entity_type, wait_seconds).await,
        Command::Sql { url } => lookup_cli::sql(&config, &url).await,
        Command::Server {
            host,
            port,
            service,
        } => server::run(config, host, port, service).await,
    }
}
