//! Address geocoding.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::util::{normalize_base_url, response_excerpt};
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode";

/// Coordinates resolved for a free-text address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: Option<String>,
}

/// Resolves addresses to coordinates. `Ok(None)` means no match.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn locate(&self, address: &str) -> Result<Option<GeoLocation>>;
}

/// Google Geocoding JSON API.
#[derive(Clone)]
pub struct GoogleGeocoder {
    base_url: String,
    api_key: String,
    client: Client,
}

impl GoogleGeocoder {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let base_url =
            normalize_base_url(base_url, "Geocoding base URL").map_err(Error::InvalidInput)?;
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(Error::InvalidInput(
                "Geocoding API key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            api_key,
            client: Client::builder().build()?,
        })
    }
}

impl fmt::Debug for GoogleGeocoder {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("GoogleGeocoder")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn locate(&self, address: &str) -> Result<Option<GeoLocation>> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(None);
        }

        let response = self
            .client
            .get(format!("{}/json", self.base_url))
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Geocoding(format!(
                "HTTP {status}: {}",
                response_excerpt(&body)
            )));
        }

        let body: GeocodeResponse = response.json().await?;
        body.into_location()
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: Option<String>,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: HashMap<String, f64>,
}

impl GeocodeResponse {
    fn into_location(self) -> Result<Option<GeoLocation>> {
        match self.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(None),
            other => {
                return Err(Error::Geocoding(match self.error_message {
                    Some(message) => format!("{other}: {message}"),
                    None => other.to_string(),
                }));
            }
        }

        let Some(first) = self.results.into_iter().next() else {
            return Ok(None);
        };
        let (Some(latitude), Some(longitude)) = (
            first.geometry.location.get("lat").copied(),
            first.geometry.location.get("lng").copied(),
        ) else {
            return Err(Error::Geocoding("result is missing lat/lng".to_string()));
        };

        Ok(Some(GeoLocation {
            latitude,
            longitude,
            formatted_address: first.formatted_address,
        }))
    }
}

/// Fixed address table, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    known: HashMap<String, GeoLocation>,
}

impl StaticGeocoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_address(mut self, address: &str, latitude: f64, longitude: f64) -> Self {
        self.known.insert(
            normalize_address(address),
            GeoLocation {
                latitude,
                longitude,
                formatted_address: Some(address.trim().to_string()),
            },
        );
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn locate(&self, address: &str) -> Result<Option<GeoLocation>> {
        Ok(self.known.get(&normalize_address(address)).cloned())
    }
}

fn normalize_address(address: &str) -> String {
    address.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Option<GeoLocation>> {
        serde_json::from_str::<GeocodeResponse>(body)
            .unwrap()
            .into_location()
    }

    #[test]
    fn parses_first_result() {
        let location = parse(
            r#"{
                "status": "OK",
                "results": [
                    {
                        "formatted_address": "10 Downing St, London",
                        "geometry": { "location": { "lat": 51.5034, "lng": -0.1276 } }
                    },
                    {
                        "geometry": { "location": { "lat": 1.0, "lng": 1.0 } }
                    }
                ]
            }"#,
        )
        .unwrap()
        .unwrap();

        assert!((location.latitude - 51.5034).abs() < f64::EPSILON);
        assert!((location.longitude + 0.1276).abs() < f64::EPSILON);
        assert_eq!(
            location.formatted_address.as_deref(),
            Some("10 Downing St, London")
        );
    }

    #[test]
    fn zero_results_is_none() {
        assert_eq!(
            parse(r#"{"status":"ZERO_RESULTS","results":[]}"#).unwrap(),
            None
        );
    }

    #[test]
    fn denied_request_is_error() {
        let err = parse(r#"{"status":"REQUEST_DENIED","error_message":"bad key"}"#).unwrap_err();
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn result_without_coordinates_is_error() {
        let err = parse(r#"{"status":"OK","results":[{"geometry":{"location":{"lat":1.0}}}]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Geocoding(message) if message.contains("lat/lng")));
    }

    #[test]
    fn empty_key_rejected() {
        assert!(GoogleGeocoder::new("  ").is_err());
        let geocoder = GoogleGeocoder::new("secret-key").unwrap();
        assert!(!format!("{geocoder:?}").contains("secret-key"));
    }

    #[tokio::test]
    async fn static_geocoder_ignores_case_and_spacing() {
        let geocoder = StaticGeocoder::new().with_address("1 Main St, Springfield", 10.0, 20.0);
        let found = geocoder.locate("  1 main st,   SPRINGFIELD ").await.unwrap();
        assert_eq!(found.map(|l| l.latitude), Some(10.0));
        assert!(geocoder.locate("Nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "Requires GOOGLE_GEOCODING_API_KEY and network access"]
    async fn google_geocoder_resolves_real_address() {
        let _ = dotenvy::dotenv();
        let key = std::env::var(crate::config::ENV_GEOCODING_API_KEY).unwrap();
        let geocoder = GoogleGeocoder::new(key).unwrap();
        let location = geocoder
            .locate("1600 Amphitheatre Parkway, Mountain View, CA")
            .await
            .unwrap();
        assert!(location.is_some());
    }
}
