//! Cloud Storage for Firebase client using the resumable upload protocol.

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use super::{ObjectStorage, UploadProgress};
use crate::config::BackendConfig;
use crate::models::ImageFile;
use crate::util::{normalize_base_url, response_excerpt};
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://firebasestorage.googleapis.com/v0";
const RESUMABLE_CHUNK_SIZE: usize = 256 * 1024;

const HEADER_PROTOCOL: &str = "X-Goog-Upload-Protocol";
const HEADER_COMMAND: &str = "X-Goog-Upload-Command";
const HEADER_OFFSET: &str = "X-Goog-Upload-Offset";
const HEADER_UPLOAD_URL: &str = "X-Goog-Upload-URL";
const HEADER_STATUS: &str = "X-Goog-Upload-Status";

#[derive(Clone)]
pub struct FirebaseStorage {
    base_url: String,
    bucket: String,
    id_token: Option<String>,
    chunk_size: usize,
    client: Client,
}

impl FirebaseStorage {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, config)
    }

    /// Build a client against a custom endpoint, e.g. the local emulator.
    pub fn with_base_url(base_url: &str, config: &BackendConfig) -> Result<Self> {
        let base_url =
            normalize_base_url(base_url, "Storage base URL").map_err(Error::InvalidInput)?;
        if config.storage_bucket.is_empty() {
            return Err(Error::InvalidInput(
                "Storage bucket must not be empty".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            bucket: config.storage_bucket.clone(),
            id_token: None,
            chunk_size: RESUMABLE_CHUNK_SIZE,
            client: Client::builder().build()?,
        })
    }

    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    /// Durable, token-protected URL for a stored object.
    #[must_use]
    pub fn download_url(&self, object_key: &str, token: &str) -> String {
        format!(
            "{}/b/{}/o/{}?alt=media&token={}",
            self.base_url,
            self.bucket,
            urlencoding::encode(object_key),
            urlencoding::encode(token)
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.id_token {
            Some(token) => request.header("Authorization", format!("Firebase {token}")),
            None => request,
        }
    }

    async fn start_session(&self, object_key: &str, file: &ImageFile) -> Result<String> {
        let url = format!("{}/b/{}/o", self.base_url, self.bucket);
        let response = self
            .authorize(self.client.post(url))
            .query(&[("name", object_key)])
            .header(HEADER_PROTOCOL, "resumable")
            .header(HEADER_COMMAND, "start")
            .header("X-Goog-Upload-Header-Content-Length", file.size_bytes())
            .header("X-Goog-Upload-Header-Content-Type", &file.content_type)
            .json(&serde_json::json!({
                "name": object_key,
                "contentType": file.content_type,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(storage_error("start", object_key, status, &body));
        }

        header_value(response.headers(), HEADER_UPLOAD_URL).ok_or_else(|| {
            Error::Storage(format!(
                "Upload session for {object_key} did not return an upload URL"
            ))
        })
    }
}

impl fmt::Debug for FirebaseStorage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FirebaseStorage")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field("authorized", &self.id_token.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ObjectStorage for FirebaseStorage {
    async fn upload(
        &self,
        object_key: &str,
        file: &ImageFile,
        progress: &(dyn Fn(UploadProgress) + Send + Sync),
    ) -> Result<String> {
        let upload_url = self.start_session(object_key, file).await?;
        let total = file.bytes.len();
        let mut offset = 0usize;
        let mut metadata = None;

        for chunk in file.bytes.chunks(self.chunk_size) {
            let is_last = offset + chunk.len() >= total;
            let command = if is_last { "upload, finalize" } else { "upload" };

            let response = self
                .authorize(self.client.post(&upload_url))
                .header(HEADER_PROTOCOL, "resumable")
                .header(HEADER_COMMAND, command)
                .header(HEADER_OFFSET, offset)
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(chunk.to_vec())
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(storage_error("upload", object_key, status, &body));
            }

            offset += chunk.len();
            progress(UploadProgress {
                file_name: file.name.clone(),
                bytes_transferred: offset as u64,
                total_bytes: total as u64,
            });

            if is_last || header_value(response.headers(), HEADER_STATUS).as_deref() == Some("final")
            {
                metadata = Some(response.json::<ObjectMetadata>().await?);
                break;
            }
        }

        let metadata = metadata.ok_or_else(|| {
            Error::Storage(format!("Upload of {object_key} never finalized"))
        })?;
        let token = metadata.first_download_token().ok_or_else(|| {
            Error::Storage(format!(
                "Upload of {object_key} did not return a download token"
            ))
        })?;

        tracing::debug!("Uploaded {} ({} bytes)", metadata.name, total);
        Ok(self.download_url(&metadata.name, token))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    name: String,
    download_tokens: Option<String>,
}

impl ObjectMetadata {
    fn first_download_token(&self) -> Option<&str> {
        self.download_tokens
            .as_deref()?
            .split(',')
            .map(str::trim)
            .find(|token| !token.is_empty())
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn storage_error(operation: &str, object_key: &str, status: u16, body: &str) -> Error {
    Error::Storage(format!(
        "Storage {operation} failed for {object_key} with HTTP {status}: {}",
        response_excerpt(body)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BackendConfig {
        BackendConfig {
            api_key: "key".to_string(),
            project_id: "house".to_string(),
            storage_bucket: "house.appspot.com".to_string(),
            geocoding_api_key: None,
        }
    }

    #[test]
    fn download_url_encodes_object_path() {
        let storage = FirebaseStorage::new(&config()).unwrap();
        let url = storage.download_url("images/user-front door.jpg-1", "tok");
        assert_eq!(
            url,
            "https://firebasestorage.googleapis.com/v0/b/house.appspot.com/o/images%2Fuser-front%20door.jpg-1?alt=media&token=tok"
        );
    }

    #[test]
    fn new_rejects_empty_bucket() {
        let mut config = config();
        config.storage_bucket = String::new();
        assert!(FirebaseStorage::new(&config).is_err());
    }

    #[test]
    fn metadata_picks_first_download_token() {
        let metadata: ObjectMetadata = serde_json::from_str(
            r#"{"name":"images/a.jpg","bucket":"b","downloadTokens":" tok-1 ,tok-2"}"#,
        )
        .unwrap();
        assert_eq!(metadata.first_download_token(), Some("tok-1"));

        let metadata: ObjectMetadata = serde_json::from_str(r#"{"name":"images/a.jpg"}"#).unwrap();
        assert_eq!(metadata.first_download_token(), None);
    }

    #[test]
    fn debug_hides_token() {
        let storage = FirebaseStorage::new(&config())
            .unwrap()
            .with_id_token("secret-token");
        assert!(!format!("{storage:?}").contains("secret-token"));
    }
}
