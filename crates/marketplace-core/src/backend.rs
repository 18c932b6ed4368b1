//! Explicit handle bundling every backend collaborator.

use std::fmt;
use std::sync::Arc;

use crate::auth::SessionHandle;
use crate::config::BackendConfig;
use crate::geocode::{Geocoder, GoogleGeocoder};
use crate::models::{Listing, ListingId};
use crate::storage::{FirebaseStorage, MemoryObjectStorage, ObjectStorage};
use crate::store::{DocumentStore, FirestoreClient, ListingQuery, MemoryDocumentStore};
use crate::Result;

/// Session, document store, object storage and optional geocoder.
///
/// Cheap to clone; clones share the same collaborators.
#[derive(Clone)]
pub struct Backend {
    session: SessionHandle,
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl Backend {
    pub fn new(
        session: SessionHandle,
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            session,
            store,
            storage,
            geocoder: None,
        }
    }

    /// Firebase-backed handle. `id_token` authorizes Firestore and Storage
    /// requests on behalf of the signed-in user.
    pub fn firebase(
        config: &BackendConfig,
        session: SessionHandle,
        id_token: Option<&str>,
    ) -> Result<Self> {
        let mut store = FirestoreClient::new(config)?;
        let mut storage = FirebaseStorage::new(config)?;
        if let Some(token) = id_token {
            store = store.with_id_token(token);
            storage = storage.with_id_token(token);
        }

        let mut backend = Self::new(session, Arc::new(store), Arc::new(storage));
        if let Some(key) = &config.geocoding_api_key {
            backend = backend.with_geocoder(Arc::new(GoogleGeocoder::new(key.clone())?));
        }
        Ok(backend)
    }

    /// Handle over in-process store and storage.
    #[must_use]
    pub fn in_memory(session: SessionHandle) -> Self {
        Self::new(
            session,
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryObjectStorage::default()),
        )
    }

    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    #[must_use]
    pub const fn session(&self) -> &SessionHandle {
        &self.session
    }

    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn storage(&self) -> &dyn ObjectStorage {
        self.storage.as_ref()
    }

    #[must_use]
    pub fn geocoder(&self) -> Option<&dyn Geocoder> {
        self.geocoder.as_deref()
    }

    /// Whether addresses are geocoded instead of taking typed coordinates.
    #[must_use]
    pub const fn geolocation_enabled(&self) -> bool {
        self.geocoder.is_some()
    }

    pub async fn listing(&self, id: &ListingId) -> Result<Option<Listing>> {
        self.store.get_listing(id).await
    }

    pub async fn browse(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        let listings = self.store.query_listings(query).await?;
        tracing::debug!("Fetched {} listings for {:?}", listings.len(), query);
        Ok(listings)
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Backend")
            .field("session", &self.session.state())
            .field("geolocation_enabled", &self.geolocation_enabled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use crate::geocode::StaticGeocoder;

    fn config(geocoding_api_key: Option<&str>) -> BackendConfig {
        BackendConfig {
            api_key: "key".to_string(),
            project_id: "house".to_string(),
            storage_bucket: "house.appspot.com".to_string(),
            geocoding_api_key: geocoding_api_key.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn firebase_backend_enables_geolocation_with_key() {
        let session = SessionHandle::new();
        let plain = Backend::firebase(&config(None), session.clone(), None).unwrap();
        assert!(!plain.geolocation_enabled());

        let geo = Backend::firebase(&config(Some("geo")), session, Some("token")).unwrap();
        assert!(geo.geolocation_enabled());
    }

    #[tokio::test]
    async fn clones_share_session_and_store() {
        let user = AuthUser {
            id: "user-1".to_string(),
            email: None,
        };
        let backend = Backend::in_memory(SessionHandle::new())
            .with_geocoder(Arc::new(StaticGeocoder::new()));
        let clone = backend.clone();

        backend.session().set_signed_in(user);
        assert_eq!(clone.session().current_user_id().as_deref(), Some("user-1"));
        assert!(clone.geolocation_enabled());
        assert!(clone.browse(&ListingQuery::default()).await.unwrap().is_empty());
    }
}
