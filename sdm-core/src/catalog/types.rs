//! Catalog document shapes and the published snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One repository of the official list and the entity types it hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialListEntry {
    /// Entity types published in this repository
    pub data_models: Vec<String>,

    /// Git URL of the repository (usually ending in `.git`)
    pub repo_link: String,
}

/// Top-level shape of `official_list_data_models.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialList {
    pub official_list: Vec<OfficialListEntry>,
}

/// One entry of `datamodels_metadata.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadataEntry {
    /// Entity type name, e.g. `WeatherObserved`
    pub data_model: String,

    pub yaml_url: String,

    pub json_schema_url: String,
}

/// Links returned for a resolved entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    pub repo: String,
    pub yaml: String,
    pub json_schema: String,
}

/// Both catalogs as fetched in the same refresh cycle
///
/// A snapshot is never mutated once published; the refresh loop replaces it
/// wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub official_list: Vec<OfficialListEntry>,
    pub metadata: Vec<ModelMetadataEntry>,
    pub fetched_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// The empty snapshot a cache starts with
    pub fn empty() -> Self {
        Self {
            official_list: Vec::new(),
            metadata: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    pub fn new(
        official_list: Vec<OfficialListEntry>,
        metadata: Vec<ModelMetadataEntry>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            official_list,
            metadata,
            fetched_at,
        }
    }

    /// True once a refresh has delivered metadata
    pub fn is_populated(&self) -> bool {
        !self.metadata.is_empty()
    }

    /// First metadata entry (in catalog order) describing `entity_type`
    pub fn find_metadata(&self, entity_type: &str) -> Option<&ModelMetadataEntry> {
        self.metadata.iter().find(|m| m.data_model == entity_type)
    }

    /// First repository (in catalog order) that hosts `entity_type`
    pub fn find_repository(&self, entity_type: &str) -> Option<&OfficialListEntry> {
        self.official_list
            .iter()
            .find(|entry| entry.data_models.iter().any(|m| m == entity_type))
    }

    /// Join both catalogs on `entity_type`
    ///
    /// Returns `None` when either catalog lacks the entity type.
    pub fn resolve(&self, entity_type: &str) -> Option<LookupResult> {
        let metadata = self.find_metadata(entity_type)?;
        let repository = self.find_repository(entity_type)?;

        Some(LookupResult {
            repo: repository_tree_link(&repository.repo_link, entity_type),
            yaml: metadata.yaml_url.clone(),
            json_schema: metadata.json_schema_url.clone(),
        })
    }
}

/// Browse link for an entity type inside its repository
///
/// Only a trailing `.git` is removed; `.git` elsewhere in the URL is kept.
pub fn repository_tree_link(repo_link: &str, entity_type: &str) -> String {
    let base = repo_link.strip_suffix(".git").unwrap_or(repo_link);
    format!("{}/tree/master/{}", base.trim_end_matches('/'), entity_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn weather_snapshot() -> CatalogSnapshot {
        CatalogSnapshot::new(
            vec![OfficialListEntry {
                data_models: vec!["WeatherObserved".to_string(), "WeatherForecast".to_string()],
                repo_link: "https://github.com/org/repo.git".to_string(),
            }],
            vec![ModelMetadataEntry {
                data_model: "WeatherObserved".to_string(),
                yaml_url: "U1".to_string(),
                json_schema_url: "U2".to_string(),
            }],
            Utc::now(),
        )
    }

    #[test]
    fn test_resolve_weather_observed() {
        let result = weather_snapshot().resolve("WeatherObserved").unwrap();

        assert_eq!(
            result,
            LookupResult {
                repo: "https://github.com/org/repo/tree/master/WeatherObserved".to_string(),
                yaml: "U1".to_string(),
                json_schema: "U2".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_requires_both_catalogs() {
        let snapshot = weather_snapshot();

        // In the official list but without metadata
        assert!(snapshot.resolve("WeatherForecast").is_none());
        assert!(snapshot.resolve("NoSuchType").is_none());
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let mut snapshot = weather_snapshot();
        snapshot.official_list.push(OfficialListEntry {
            data_models: vec!["WeatherObserved".to_string()],
            repo_link: "https://github.com/other/repo.git".to_string(),
        });
        snapshot.metadata.push(ModelMetadataEntry {
            data_model: "WeatherObserved".to_string(),
            yaml_url: "second".to_string(),
            json_schema_url: "second".to_string(),
        });

        let result = snapshot.resolve("WeatherObserved").unwrap();
        assert_eq!(result.repo, "https://github.com/org/repo/tree/master/WeatherObserved");
        assert_eq!(result.yaml, "U1");
    }

    #[test]
    fn test_repository_tree_link() {
        assert_eq!(
            repository_tree_link("https://github.com/org/repo.git", "Alert"),
            "https://github.com/org/repo/tree/master/Alert"
        );
        assert_eq!(
            repository_tree_link("https://github.com/org/repo/", "Alert"),
            "https://github.com/org/repo/tree/master/Alert"
        );
        // Only the suffix is stripped
        assert_eq!(
            repository_tree_link("https://github.com/org/dataModel.github.git", "Alert"),
            "https://github.com/org/dataModel.github/tree/master/Alert"
        );
    }

    #[test]
    fn test_official_list_ignores_extra_keys() {
        let json = serde_json::json!({
            "officialList": [{
                "repoName": "dataModel.Weather",
                "repoLink": "https://github.com/smart-data-models/dataModel.Weather.git",
                "dataModels": ["WeatherObserved"],
                "domains": ["SmartCities"]
            }]
        });

        let list: OfficialList = serde_json::from_value(json).unwrap();
        assert_eq!(list.official_list.len(), 1);
        assert_eq!(list.official_list[0].data_models, vec!["WeatherObserved"]);
    }

    #[test]
    fn test_entries_without_links_are_rejected() {
        let official = serde_json::json!({
            "officialList": [{"dataModels": ["WeatherObserved"]}]
        });
        assert!(serde_json::from_value::<OfficialList>(official).is_err());

        let metadata = serde_json::json!([{"dataModel": "WeatherObserved"}]);
        assert!(serde_json::from_value::<Vec<ModelMetadataEntry>>(metadata).is_err());
    }

    #[test]
    fn test_empty_snapshot_is_not_populated() {
        assert!(!CatalogSnapshot::empty().is_populated());
        assert!(weather_snapshot().is_populated());
    }
}
