//! Request handlers for `/version` and both `/entity` flavours

use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use sdm_core::service::ServiceError;

use crate::server::AppState;

const MISSING_TYPE_MESSAGE: &str = "It is needed to provide a JSON object in the payload with the key 'type' and the value of a valid Entity Type";

const MISSING_URL_MESSAGE: &str = "It is needed to provide a JSON object in the payload with the key 'url' and the value of a valid GitHub URL";

/// Response for `GET /version`
#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub doc: &'static str,
    pub git_hash: &'static str,
    pub version: &'static str,
    pub release_date: &'static str,
    pub uptime: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

fn message(status: actix_web::http::StatusCode, text: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(MessageResponse {
        message: text.into(),
    })
}

fn error_response(err: &ServiceError) -> HttpResponse {
    let status = match err {
        ServiceError::Unavailable => actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
        _ => actix_web::http::StatusCode::BAD_REQUEST,
    };
    message(status, err.to_string())
}

/// String value of `key` in a JSON object body, if any
fn string_field(body: &[u8], key: &str) -> Option<String> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    payload.get(key)?.as_str().map(str::to_string)
}

/// Human-readable uptime, e.g. `1 days, 2 hours, 3 minutes, and 4 seconds`
pub fn format_uptime(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let (hours, remainder) = (total_seconds / 3600, total_seconds % 3600);
    let (minutes, seconds) = (remainder / 60, remainder % 60);
    let (days, hours) = (hours / 24, hours % 24);

    format!("{days} days, {hours} hours, {minutes} minutes, and {seconds} seconds")
}

/// GET /version
pub async fn version(state: web::Data<AppState>) -> impl Responder {
    info!("GET /version - Request version information");

    let uptime = (Utc::now() - state.started_at).num_seconds();

    HttpResponse::Ok().json(VersionInfo {
        doc: env!("CARGO_PKG_DESCRIPTION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("nogitversion"),
        version: env!("CARGO_PKG_VERSION"),
        release_date: option_env!("RELEASE_DATE").unwrap_or("no released"),
        uptime: format_uptime(uptime),
    })
}

/// POST /entity with `{"type": "<EntityType>"}`
pub async fn entity_links(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    info!("POST /entity - Obtaining SDM JSON Schema");

    let Some(entity_type) = string_field(&body, "type") else {
        error!("Missing JSON payload");
        return message(actix_web::http::StatusCode::BAD_REQUEST, MISSING_TYPE_MESSAGE);
    };

    match state.service.entity_links(&entity_type).await {
        Ok(links) => HttpResponse::Ok().json(links),
        Err(e) => error_response(&e),
    }
}

/// POST /entity with `{"url": "<github-url>"}`
pub async fn sql_schema(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    info!("POST /entity - Generating SQL schema");

    let Some(url) = string_field(&body, "url") else {
        error!("Missing JSON payload");
        return message(actix_web::http::StatusCode::BAD_REQUEST, MISSING_URL_MESSAGE);
    };

    match state.service.sql_schema(&url).await {
        Ok(schema) => message(actix_web::http::StatusCode::OK, schema),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{routes, security_headers, ServiceKind};
    use actix_web::{test, App};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use sdm_core::catalog::{CatalogCache, CatalogSource, FetchError};
    use sdm_core::config::CatalogConfig;
    use sdm_core::schema::SchemaGenerator;
    use sdm_core::service::LookupService;
    use serde_json::json;
    use std::sync::Arc;

    struct WeatherSource;

    #[async_trait]
    impl CatalogSource for WeatherSource {
        async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
            if url == "mem://official" {
                Ok(json!({
                    "officialList": [{
                        "dataModels": ["WeatherObserved"],
                        "repoLink": "https://github.com/org/repo.git"
                    }]
                }))
            } else {
                Ok(json!([{"dataModel": "WeatherObserved", "yamlUrl": "U1", "jsonSchemaUrl": "U2"}]))
            }
        }
    }

    struct StaticGenerator;

    #[async_trait]
    impl SchemaGenerator for StaticGenerator {
        async fn generate(&self, _model_url: &str) -> anyhow::Result<String> {
            Ok("CREATE TABLE \"WeatherObserved\" (\n    \"id\" TEXT PRIMARY KEY\n);".to_string())
        }
    }

    async fn state() -> web::Data<AppState> {
        let config = CatalogConfig {
            official_list_url: "mem://official".to_string(),
            metadata_url: "mem://metadata".to_string(),
            ..Default::default()
        };
        let cache = Arc::new(CatalogCache::new(config, Arc::new(WeatherSource)));
        cache.refresh_now().await;

        web::Data::new(AppState::new(LookupService::new(
            cache,
            Arc::new(StaticGenerator),
        )))
    }

    async fn post_entity(kind: ServiceKind, payload: Option<Value>) -> (u16, Value) {
        let app = test::init_service(
            App::new()
                .wrap(security_headers())
                .app_data(state().await)
                .configure(|cfg| routes(cfg, kind)),
        )
        .await;

        let request = test::TestRequest::post().uri("/entity");
        let request = match payload {
            Some(payload) => request.set_json(payload),
            None => request.set_payload("this is not json"),
        };

        let resp = test::call_service(&app, request.to_request()).await;
        let status = resp.status().as_u16();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn test_version() {
        let app = test::init_service(
            App::new()
                .wrap(security_headers())
                .app_data(state().await)
                .configure(|cfg| routes(cfg, ServiceKind::Links)),
        )
        .await;

        let req = test::TestRequest::get().uri("/version").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(resp.headers().get("referrer-policy").unwrap(), "no-referrer");
        assert_eq!(resp.headers().get("server").unwrap(), "Secure");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["uptime"].as_str().unwrap().ends_with("seconds"));
        for key in ["doc", "git_hash", "release_date"] {
            assert!(body.get(key).is_some(), "missing {key}");
        }
    }

    #[actix_web::test]
    async fn test_entity_links() {
        let (status, body) =
            post_entity(ServiceKind::Links, Some(json!({"type": "WeatherObserved"}))).await;

        assert_eq!(status, 200);
        assert_eq!(
            body,
            json!({
                "repo": "https://github.com/org/repo/tree/master/WeatherObserved",
                "yaml": "U1",
                "jsonSchema": "U2"
            })
        );
    }

    #[actix_web::test]
    async fn test_entity_links_missing_type() {
        let (status, body) = post_entity(ServiceKind::Links, Some(json!({}))).await;

        assert_eq!(status, 400);
        assert!(body["message"].as_str().unwrap().contains("'type'"));
    }

    #[actix_web::test]
    async fn test_entity_links_invalid_json() {
        let (status, body) = post_entity(ServiceKind::Links, None).await;

        assert_eq!(status, 400);
        assert_eq!(body["message"], MISSING_TYPE_MESSAGE);
    }

    #[actix_web::test]
    async fn test_entity_links_unknown_type() {
        let (status, body) =
            post_entity(ServiceKind::Links, Some(json!({"type": "NoSuchType"}))).await;

        assert_eq!(status, 400);
        assert_eq!(body["message"], "Unable to find the Entity Type: NoSuchType");
    }

    #[actix_web::test]
    async fn test_sql_schema() {
        let url = "https://github.com/smart-data-models/dataModel.Weather/blob/master/WeatherObserved/model.yaml";
        let (status, body) = post_entity(ServiceKind::Sql, Some(json!({"url": url}))).await;

        assert_eq!(status, 200);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("CREATE TABLE \"WeatherObserved\""));
    }

    #[actix_web::test]
    async fn test_sql_schema_invalid_url() {
        let (status, body) =
            post_entity(ServiceKind::Sql, Some(json!({"url": "https://example.com/x"}))).await;

        assert_eq!(status, 400);
        assert_eq!(body["message"], "Invalid GitHub URL: https://example.com/x");
    }

    #[actix_web::test]
    async fn test_sql_schema_missing_url() {
        let (status, body) = post_entity(ServiceKind::Sql, Some(json!({"type": "Alert"}))).await;

        assert_eq!(status, 400);
        assert_eq!(body["message"], MISSING_URL_MESSAGE);
    }
}
