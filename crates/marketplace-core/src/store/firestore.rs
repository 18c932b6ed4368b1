//! Cloud Firestore REST client for listing documents.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::value::{decode_fields, encode_fields};
use super::{DocumentStore, ListingQuery, LISTINGS_COLLECTION};
use crate::config::BackendConfig;
use crate::models::{Listing, ListingFields, ListingId};
use crate::util::{normalize_base_url, response_excerpt};
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Every document field a listing write owns. Paths missing from the
/// payload are deleted, which drops `discountedPrice` for non-offers and
/// the legacy `imgUrls` key.
const LISTING_FIELD_PATHS: &[&str] = &[
    "type",
    "name",
    "bedrooms",
    "bathrooms",
    "parking",
    "furnished",
    "address",
    "latitude",
    "longitude",
    "offer",
    "regularPrice",
    "discountedPrice",
    "imageUrls",
    "imgUrls",
    "userRef",
];

#[derive(Clone)]
pub struct FirestoreClient {
    base_url: String,
    project_id: String,
    api_key: String,
    id_token: Option<String>,
    client: Client,
}

impl FirestoreClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, config)
    }

    /// Build a client against a custom endpoint, e.g. the local emulator.
    pub fn with_base_url(base_url: &str, config: &BackendConfig) -> Result<Self> {
        let base_url =
            normalize_base_url(base_url, "Firestore base URL").map_err(Error::InvalidInput)?;
        Ok(Self {
            base_url,
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            id_token: None,
            client: Client::builder().build()?,
        })
    }

    /// Authorize requests as the signed-in user so security rules apply.
    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn document_name(&self, id: &ListingId) -> String {
        format!("{}/{LISTINGS_COLLECTION}/{id}", self.database_path())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.query(&[("key", self.api_key.as_str())]);
        match &self.id_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn commit(&self, write: Value, id: &ListingId) -> Result<()> {
        let url = format!("{}/{}:commit", self.base_url, self.database_path());
        let response = self
            .authorize(self.client.post(url))
            .json(&json!({ "writes": [write] }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::NotFound(id.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(api_error("commit", status, &body))
            }
        }
    }

    fn listing_write(&self, id: &ListingId, fields: &ListingFields, exists: bool) -> Result<Value> {
        let Value::Object(object) = serde_json::to_value(fields)? else {
            return Err(Error::Store(
                "listing fields did not serialize to an object".to_string(),
            ));
        };

        Ok(json!({
            "update": {
                "name": self.document_name(id),
                "fields": encode_fields(&object),
            },
            "updateMask": { "fieldPaths": LISTING_FIELD_PATHS },
            "updateTransforms": [
                { "fieldPath": "timestamp", "setToServerValue": "REQUEST_TIME" }
            ],
            "currentDocument": { "exists": exists },
        }))
    }
}

impl fmt::Debug for FirestoreClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FirestoreClient")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("authorized", &self.id_token.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn get_listing(&self, id: &ListingId) -> Result<Option<Listing>> {
        let url = format!("{}/{}", self.base_url, self.document_name(id));
        let response = self.authorize(self.client.get(url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let document = response.json::<FirestoreDocument>().await?;
                document.into_listing().map(Some)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(api_error("get", status, &body))
            }
        }
    }

    async fn create_listing(&self, fields: &ListingFields) -> Result<ListingId> {
        let id = ListingId::generate();
        let write = self.listing_write(&id, fields, false)?;
        self.commit(write, &id).await?;
        tracing::info!("Created listing {id}");
        Ok(id)
    }

    async fn update_listing(&self, id: &ListingId, fields: &ListingFields) -> Result<()> {
        let write = self.listing_write(id, fields, true)?;
        self.commit(write, id).await?;
        tracing::info!("Updated listing {id}");
        Ok(())
    }

    async fn query_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        let url = format!("{}/{}:runQuery", self.base_url, self.database_path());
        let response = self
            .authorize(self.client.post(url))
            .json(&json!({ "structuredQuery": structured_query(query) }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(api_error("runQuery", status, &body));
        }

        response
            .json::<Vec<RunQueryResponse>>()
            .await?
            .into_iter()
            .filter_map(|row| row.document)
            .map(FirestoreDocument::into_listing)
            .collect()
    }
}

fn structured_query(query: &ListingQuery) -> Value {
    let mut filters = Vec::new();
    if let Some(listing_type) = query.listing_type {
        filters.push(field_equals("type", json!({ "stringValue": listing_type.as_str() })));
    }
    if query.offers_only {
        filters.push(field_equals("offer", json!({ "booleanValue": true })));
    }
    if let Some(owner) = &query.owner {
        filters.push(field_equals("userRef", json!({ "stringValue": owner })));
    }

    let mut structured = json!({
        "from": [{ "collectionId": LISTINGS_COLLECTION }],
        "orderBy": [{ "field": { "fieldPath": "timestamp" }, "direction": "DESCENDING" }],
        "limit": query.limit,
    });

    let filter = match filters.len() {
        0 => None,
        1 => filters.pop(),
        _ => Some(json!({ "compositeFilter": { "op": "AND", "filters": filters } })),
    };
    if let (Some(filter), Some(object)) = (filter, structured.as_object_mut()) {
        object.insert("where".to_string(), filter);
    }

    structured
}

fn field_equals(path: &str, value: Value) -> Value {
    json!({
        "fieldFilter": {
            "field": { "fieldPath": path },
            "op": "EQUAL",
            "value": value,
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    update_time: Option<DateTime<Utc>>,
}

impl FirestoreDocument {
    fn into_listing(self) -> Result<Listing> {
        let id: ListingId = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .parse()?;
        let mut object = decode_fields(&self.fields)?;

        let timestamp = match object.remove("timestamp") {
            Some(Value::String(raw)) => Some(
                DateTime::parse_from_rfc3339(&raw)
                    .map_err(|error| Error::Store(format!("invalid timestamp '{raw}': {error}")))?
                    .with_timezone(&Utc),
            ),
            _ => self.update_time,
        };

        let fields: ListingFields = serde_json::from_value(Value::Object(object))
            .map_err(|error| Error::Store(format!("listing {id} is malformed: {error}")))?;

        Ok(Listing {
            id,
            fields,
            timestamp,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RunQueryResponse {
    document: Option<FirestoreDocument>,
}

#[derive(Debug, Deserialize)]
struct FirestoreErrorResponse {
    error: Option<FirestoreErrorBody>,
}

#[derive(Debug, Deserialize)]
struct FirestoreErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn api_error(operation: &str, status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<FirestoreErrorResponse>(body)
        .ok()
        .and_then(|payload| payload.error)
        .and_then(|error| match (error.status, error.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (None, Some(message)) => Some(message),
            (Some(code), None) => Some(code),
            (None, None) => None,
        })
        .unwrap_or_else(|| response_excerpt(body));

    Error::Store(format!(
        "Firestore {operation} failed with HTTP {}: {detail}",
        status.as_u16()
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::ListingType;

    fn config() -> BackendConfig {
        BackendConfig {
            api_key: "key".to_string(),
            project_id: "house".to_string(),
            storage_bucket: "house.appspot.com".to_string(),
            geocoding_api_key: None,
        }
    }

    fn fields() -> ListingFields {
        ListingFields {
            listing_type: ListingType::Rent,
            name: "Sunny loft in old town".to_string(),
            bedrooms: 2,
            bathrooms: 1,
            parking: false,
            furnished: true,
            address: "1 Main St".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            offer: false,
            regular_price: 900.0,
            discounted_price: None,
            image_urls: vec!["https://img/1.jpg".to_string()],
            user_ref: "owner".to_string(),
        }
    }

    #[test]
    fn listing_write_targets_document_and_sets_server_timestamp() {
        let client = FirestoreClient::new(&config()).unwrap();
        let id: ListingId = "abc".parse().unwrap();

        let write = client.listing_write(&id, &fields(), true).unwrap();
        assert_eq!(
            write["update"]["name"],
            "projects/house/databases/(default)/documents/listings/abc"
        );
        assert_eq!(write["update"]["fields"]["bedrooms"], json!({ "integerValue": "2" }));
        assert!(write["update"]["fields"].get("discountedPrice").is_none());
        assert!(write["updateMask"]["fieldPaths"]
            .as_array()
            .unwrap()
            .contains(&json!("discountedPrice")));
        assert_eq!(write["updateTransforms"][0]["setToServerValue"], "REQUEST_TIME");
        assert_eq!(write["currentDocument"]["exists"], true);
    }

    #[test]
    fn structured_query_combines_filters() {
        let query = ListingQuery {
            listing_type: Some(ListingType::Sale),
            offers_only: true,
            owner: None,
            limit: 5,
        };
        let structured = structured_query(&query);
        assert_eq!(structured["limit"], 5);
        assert_eq!(structured["where"]["compositeFilter"]["op"], "AND");
        assert_eq!(
            structured["where"]["compositeFilter"]["filters"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn structured_query_single_filter_and_none() {
        let single = structured_query(&ListingQuery::category(ListingType::Rent));
        assert_eq!(single["where"]["fieldFilter"]["field"]["fieldPath"], "type");
        assert_eq!(single["where"]["fieldFilter"]["value"]["stringValue"], "rent");

        let none = structured_query(&ListingQuery::default());
        assert!(none.get("where").is_none());
        assert_eq!(none["orderBy"][0]["direction"], "DESCENDING");
    }

    #[test]
    fn document_decodes_into_listing() {
        let document: FirestoreDocument = serde_json::from_value(json!({
            "name": "projects/house/databases/(default)/documents/listings/XyZ123",
            "fields": {
                "type": { "stringValue": "sale" },
                "name": { "stringValue": "Family home with garden" },
                "bedrooms": { "integerValue": "4" },
                "bathrooms": { "stringValue": "2" },
                "offer": { "booleanValue": true },
                "regularPrice": { "integerValue": "300000" },
                "discountedPrice": { "integerValue": "280000" },
                "imgUrls": { "arrayValue": { "values": [ { "stringValue": "https://img/a.jpg" } ] } },
                "userRef": { "stringValue": "owner" },
                "timestamp": { "timestampValue": "2024-03-01T10:00:00Z" }
            },
            "createTime": "2024-03-01T10:00:00Z",
            "updateTime": "2024-03-02T10:00:00Z"
        }))
        .unwrap();

        let listing = document.into_listing().unwrap();
        assert_eq!(listing.id.as_str(), "XyZ123");
        assert_eq!(listing.fields.listing_type, ListingType::Sale);
        assert_eq!(listing.fields.bathrooms, 2);
        assert_eq!(listing.fields.discounted_price, Some(280_000.0));
        assert_eq!(listing.cover_image(), Some("https://img/a.jpg"));
        assert_eq!(
            listing.timestamp.unwrap().to_rfc3339(),
            "2024-03-01T10:00:00+00:00"
        );
    }

    #[test]
    fn api_error_prefers_structured_message() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        let error = api_error("commit", StatusCode::FORBIDDEN, body);
        assert_eq!(
            error.to_string(),
            "Document store error: Firestore commit failed with HTTP 403: PERMISSION_DENIED: Missing or insufficient permissions."
        );
    }

    #[test]
    fn debug_hides_token() {
        let client = FirestoreClient::new(&config())
            .unwrap()
            .with_id_token("secret-token");
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("authorized: true"));
    }
}
