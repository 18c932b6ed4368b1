//! Listing model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Maximum number of images a listing may carry.
pub const MAX_LISTING_IMAGES: usize = 6;

/// Length of client-generated document ids (Firestore convention).
const GENERATED_ID_LEN: usize = 20;

/// Opaque identifier of a listing document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    /// Generate a new random 20 character alphanumeric document id.
    #[must_use]
    pub fn generate() -> Self {
        let id = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ListingId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Listing id cannot be empty".to_string()));
        }
        if trimmed.contains('/') {
            return Err(Error::InvalidInput(format!(
                "Listing id must not contain '/': {trimmed}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Listing category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    #[default]
    Rent,
}

impl ListingType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Rent => "rent",
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sale" => Ok(Self::Sale),
            "rent" => Ok(Self::Rent),
            other => Err(Error::InvalidInput(format!(
                "Listing type must be 'sale' or 'rent', got '{other}'"
            ))),
        }
    }
}

/// Document body of a listing in the `listings` collection.
///
/// Older web clients stored form values verbatim, so numeric fields accept
/// numeric strings and the image list also decodes from `imgUrls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingFields {
    #[serde(rename = "type")]
    pub listing_type: ListingType,
    pub name: String,
    #[serde(deserialize_with = "deserialize_count")]
    pub bedrooms: u32,
    #[serde(deserialize_with = "deserialize_count")]
    pub bathrooms: u32,
    #[serde(default)]
    pub parking: bool,
    #[serde(default)]
    pub furnished: bool,
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "deserialize_number")]
    pub latitude: f64,
    #[serde(default, deserialize_with = "deserialize_number")]
    pub longitude: f64,
    #[serde(default)]
    pub offer: bool,
    #[serde(deserialize_with = "deserialize_number")]
    pub regular_price: f64,
    /// Only present when `offer` is true.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_number"
    )]
    pub discounted_price: Option<f64>,
    /// Ordered image URLs; the first one is the cover image.
    #[serde(rename = "imageUrls", alias = "imgUrls", default)]
    pub image_urls: Vec<String>,
    pub user_ref: String,
}

impl ListingFields {
    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_ref == user_id
    }

    /// Price a buyer actually pays: the discounted price for offers.
    #[must_use]
    pub fn effective_price(&self) -> f64 {
        if self.offer {
            self.discounted_price.unwrap_or(self.regular_price)
        } else {
            self.regular_price
        }
    }
}

/// A listing document together with its id and server timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    #[serde(flatten)]
    pub fields: ListingFields,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Listing {
    #[must_use]
    pub fn cover_image(&self) -> Option<&str> {
        self.fields.image_urls.first().map(String::as_str)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn deserialize_number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn deserialize_optional_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(value)) => Ok(Some(value)),
        Some(NumberOrText::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(value)
            if value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) =>
        {
            Ok(value as u32)
        }
        NumberOrText::Number(value) => Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {value}"
        ))),
        NumberOrText::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
