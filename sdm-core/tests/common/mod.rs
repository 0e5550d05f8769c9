//! Shared helpers for catalog cache integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use sdm_core::catalog::{CatalogSource, FetchError};
use sdm_core::config::CatalogConfig;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const OFFICIAL_URL: &str = "mem://official_list_data_models.json";
pub const METADATA_URL: &str = "mem://datamodels_metadata.json";

/// Catalog source whose documents can be swapped or failed at any time
pub struct ScriptedSource {
    official: Mutex<Option<Value>>,
    metadata: Mutex<Option<Value>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    /// Source serving the WeatherObserved catalogs
    pub fn weather() -> Self {
        Self {
            official: Mutex::new(Some(official_list())),
            metadata: Mutex::new(Some(metadata())),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        }
    }

    /// Source where every fetch fails
    pub fn unreachable() -> Self {
        Self {
            official: Mutex::new(None),
            metadata: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_official(&self, document: Option<Value>) {
        *self.official.lock().unwrap() = document;
    }

    pub fn set_metadata(&self, document: Option<Value>) {
        *self.metadata.lock().unwrap() = document;
    }

    /// Make every fetch take `delay` before answering
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Number of fetches performed so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for ScriptedSource {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let document = match url {
            OFFICIAL_URL => self.official.lock().unwrap().clone(),
            METADATA_URL => self.metadata.lock().unwrap().clone(),
            _ => None,
        };

        document.ok_or_else(|| FetchError::ConnectionFailed {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

pub fn official_list() -> Value {
    json!({
        "officialList": [
            {
                "repoName": "dataModel.Weather",
                "dataModels": ["WeatherObserved", "WeatherForecast"],
                "repoLink": "https://github.com/org/repo.git"
            },
            {
                "repoName": "dataModel.Alert",
                "dataModels": ["Alert"],
                "repoLink": "https://github.com/smart-data-models/dataModel.Alert.git"
            }
        ]
    })
}

pub fn metadata() -> Value {
    json!([
        {"dataModel": "WeatherObserved", "yamlUrl": "U1", "jsonSchemaUrl": "U2", "domain": "SmartCities"},
        {"dataModel": "Alert", "yamlUrl": "A1", "jsonSchemaUrl": "A2"}
    ])
}

/// Catalog configuration pointing at the scripted source
pub fn config() -> CatalogConfig {
    CatalogConfig {
        official_list_url: OFFICIAL_URL.to_string(),
        metadata_url: METADATA_URL.to_string(),
        ..Default::default()
    }
}
