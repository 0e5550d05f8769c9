//! HTTP façade
//!
//! Wires the actix-web application to a [`LookupService`]. The links flavour
//! starts the catalog refresh loop before binding; the SQL flavour only needs
//! the schema generator. HTTPS is served when the config names a certificate
//! and key, plain HTTP otherwise.

use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use sdm_core::catalog::{CatalogCache, HttpCatalogFetcher};
use sdm_core::config::ServiceConfig;
use sdm_core::schema::ModelYamlGenerator;
use sdm_core::service::LookupService;

use crate::handlers;

/// Download timeout for model.yaml files
const GENERATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Which `POST /entity` flavour the server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceKind {
    /// `{"type": ...}` → repository, YAML and JSON Schema links
    Links,
    /// `{"url": ...}` → generated SQL schema
    Sql,
}

/// State shared by every worker
pub struct AppState {
    pub service: LookupService,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: LookupService) -> Self {
        Self {
            service,
            started_at: Utc::now(),
        }
    }
}

/// Compose the catalog cache, fetcher and generator from configuration
pub fn build_service(config: &ServiceConfig) -> Result<LookupService> {
    let fetcher = HttpCatalogFetcher::new(config.catalog.fetch_timeout())?;
    let cache = Arc::new(CatalogCache::new(config.catalog.clone(), Arc::new(fetcher)));
    let generator = ModelYamlGenerator::new(GENERATOR_TIMEOUT)?;

    Ok(LookupService::new(cache, Arc::new(generator)))
}

/// Register the routes for `kind`
pub fn routes(cfg: &mut web::ServiceConfig, kind: ServiceKind) {
    cfg.route("/version", web::get().to(handlers::version));

    match kind {
        ServiceKind::Links => cfg.route("/entity", web::post().to(handlers::entity_links)),
        ServiceKind::Sql => cfg.route("/entity", web::post().to(handlers::sql_schema)),
    };
}

/// Security headers added to every response
pub fn security_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add(("Server", "Secure"))
        .add((
            "Content-Security-Policy",
            "default-src 'none'; base-uri 'self'; frame-src 'none'",
        ))
        .add((
            "Strict-Transport-Security",
            "max-age=2592000; includeSubDomains; preload",
        ))
        .add(("Referrer-Policy", "no-referrer"))
        .add(("Cache-Control", "must-revalidate"))
}

/// Build the rustls server configuration from PEM files
pub fn load_tls_config(cert: &Path, key: &Path) -> Result<rustls::ServerConfig> {
    let certs = CertificateDer::pem_file_iter(cert)
        .and_then(|certs| certs.collect::<Result<Vec<_>, _>>())
        .with_context(|| format!("Failed to read certificate: {}", cert.display()))?;
    if certs.is_empty() {
        anyhow::bail!("No certificate found in {}", cert.display());
    }

    let private_key = PrivateKeyDer::from_pem_file(key)
        .with_context(|| format!("Failed to read private key: {}", key.display()))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .context("Failed to select TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(certs, private_key)
        .context("Invalid certificate or private key")
}

/// Start the HTTP server and manage graceful shutdown
pub async fn run(
    config: ServiceConfig,
    host: Option<String>,
    port: Option<u16>,
    kind: ServiceKind,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let bind_addr = format!("{host}:{port}");

    let tls = match config.server.tls_files() {
        Some((cert, key)) => Some(load_tls_config(cert, key)?),
        None => None,
    };

    let state = web::Data::new(AppState::new(build_service(&config)?));
    if kind == ServiceKind::Links {
        state.service.cache().start()?;
    }

    let scheme = if tls.is_some() { "https" } else { "http" };
    info!(
        "Starting HTTP server on {}://{} ({:?} service)",
        scheme, bind_addr, kind
    );
    info!("Endpoints: GET /version, POST /entity");

    let app_state = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(security_headers())
            .app_data(app_state.clone())
            .configure(|cfg| routes(cfg, kind))
    });

    let server = match tls {
        Some(tls) => server.bind_rustls_0_23(&bind_addr, tls),
        None => server.bind(&bind_addr),
    }
    .with_context(|| format!("Failed to bind {bind_addr}"))?
    .disable_signals()
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server failed: {}", e),
                Err(e) => error!("Server task failed: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
            server_handle.stop(true).await;
        }
    }

    state.service.cache().stop().await;

    info!("Server shutdown complete");
    Ok(())
}
