//! Firebase backend configuration shared by every client.
//!
//! Values here are the public web-app keys Firebase issues per project;
//! service-account secrets never belong in this struct.

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::normalize_text_option;
use crate::{Error, Result};

pub const ENV_API_KEY: &str = "FIREBASE_API_KEY";
pub const ENV_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
pub const ENV_STORAGE_BUCKET: &str = "FIREBASE_STORAGE_BUCKET";
pub const ENV_GEOCODING_API_KEY: &str = "GOOGLE_GEOCODING_API_KEY";

/// Resolved backend configuration.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Firebase web API key.
    pub api_key: String,
    /// Firebase project identifier (Firestore database owner).
    pub project_id: String,
    /// Cloud Storage bucket, e.g. `my-app.appspot.com`.
    pub storage_bucket: String,
    /// Enables address geocoding when present.
    #[serde(default)]
    pub geocoding_api_key: Option<String>,
}

impl BackendConfig {
    /// Load backend configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no Firebase variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    /// Build a config from optional parts, e.g. a CLI profile.
    pub fn from_parts(
        api_key: Option<String>,
        project_id: Option<String>,
        storage_bucket: Option<String>,
        geocoding_api_key: Option<String>,
    ) -> Result<Option<Self>> {
        parse_config(|key| match key {
            ENV_API_KEY => api_key.clone(),
            ENV_PROJECT_ID => project_id.clone(),
            ENV_STORAGE_BUCKET => storage_bucket.clone(),
            ENV_GEOCODING_API_KEY => geocoding_api_key.clone(),
            _ => None,
        })
    }

    /// Whether address lookup replaces manually entered coordinates.
    #[must_use]
    pub const fn geolocation_enabled(&self) -> bool {
        self.geocoding_api_key.is_some()
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BackendConfig")
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("storage_bucket", &self.storage_bucket)
            .field(
                "geocoding_api_key",
                &self.geocoding_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<BackendConfig>> {
    let api_key = normalize_text_option(lookup(ENV_API_KEY));
    let project_id = normalize_text_option(lookup(ENV_PROJECT_ID));
    let storage_bucket = normalize_text_option(lookup(ENV_STORAGE_BUCKET));
    let geocoding_api_key = normalize_text_option(lookup(ENV_GEOCODING_API_KEY));

    let (api_key, project_id, storage_bucket) = match (api_key, project_id, storage_bucket) {
        (None, None, None) => return Ok(None),
        (Some(api_key), Some(project_id), Some(storage_bucket)) => {
            (api_key, project_id, storage_bucket)
        }
        (api_key, project_id, storage_bucket) => {
            let mut missing = Vec::new();
            if api_key.is_none() {
                missing.push(ENV_API_KEY);
            }
            if project_id.is_none() {
                missing.push(ENV_PROJECT_ID);
            }
            if storage_bucket.is_none() {
                missing.push(ENV_STORAGE_BUCKET);
            }
            return Err(Error::InvalidInput(format!(
                "Firebase configuration is incomplete. Missing: {}",
                missing.join(", ")
            )));
        }
    };

    if project_id.contains('/') {
        return Err(Error::InvalidInput(format!(
            "{ENV_PROJECT_ID} must not contain '/'"
        )));
    }

    let storage_bucket = storage_bucket
        .trim_start_matches("gs://")
        .trim_end_matches('/')
        .to_string();

    Ok(Some(BackendConfig {
        api_key,
        project_id,
        storage_bucket,
        geocoding_api_key,
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parse_from_map(map: &HashMap<&str, &str>) -> Result<Option<BackendConfig>> {
        parse_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn parse_config_none_returns_none() {
        let map = HashMap::new();
        assert!(parse_from_map(&map).unwrap().is_none());
    }

    #[test]
    fn parse_config_requires_all_required_values() {
        let mut map = HashMap::new();
        map.insert(ENV_API_KEY, "key");

        let err = parse_from_map(&map).unwrap_err();
        match err {
            Error::InvalidInput(message) => {
                assert!(message.contains(ENV_PROJECT_ID));
                assert!(message.contains(ENV_STORAGE_BUCKET));
                assert!(!message.contains(ENV_API_KEY));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_config_normalizes_bucket_and_optional_geocoding() {
        let mut map = HashMap::new();
        map.insert(ENV_API_KEY, " key ");
        map.insert(ENV_PROJECT_ID, "house-marketplace");
        map.insert(ENV_STORAGE_BUCKET, "gs://house-marketplace.appspot.com/");
        map.insert(ENV_GEOCODING_API_KEY, "   ");

        let config = parse_from_map(&map).unwrap().unwrap();
        assert_eq!(config.api_key, "key");
        assert_eq!(config.storage_bucket, "house-marketplace.appspot.com");
        assert_eq!(config.geocoding_api_key, None);
        assert!(!config.geolocation_enabled());
    }

    #[test]
    fn parse_config_rejects_project_path() {
        let mut map = HashMap::new();
        map.insert(ENV_API_KEY, "key");
        map.insert(ENV_PROJECT_ID, "projects/house");
        map.insert(ENV_STORAGE_BUCKET, "bucket");

        assert!(parse_from_map(&map).is_err());
    }

    #[test]
    fn from_parts_matches_env_semantics() {
        let config = BackendConfig::from_parts(
            Some("key".to_string()),
            Some("house".to_string()),
            Some("house.appspot.com".to_string()),
            Some("geo".to_string()),
        )
        .unwrap()
        .unwrap();
        assert!(config.geolocation_enabled());
        assert!(BackendConfig::from_parts(None, None, None, None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn debug_redacts_keys() {
        let config = BackendConfig {
            api_key: "secret-api-key".to_string(),
            project_id: "house".to_string(),
            storage_bucket: "bucket".to_string(),
            geocoding_api_key: Some("secret-geo-key".to_string()),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-api-key"));
        assert!(!rendered.contains("secret-geo-key"));
    }

    #[test]
    #[ignore = "Requires local Firebase env vars in process environment or .env"]
    fn from_env_loads_real_config() {
        let _ = dotenvy::dotenv();

        let config = BackendConfig::from_env()
            .expect("Firebase env parsing should not error")
            .expect("Firebase config should be present");
        assert!(!config.project_id.is_empty());
    }
}
