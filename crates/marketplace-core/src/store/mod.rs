//! Document store for the `listings` collection.

mod firestore;
mod memory;
pub mod value;

use async_trait::async_trait;

use crate::models::{Listing, ListingFields, ListingId, ListingType};
use crate::Result;

pub use firestore::FirestoreClient;
pub use memory::MemoryDocumentStore;

/// Collection holding listing documents.
pub const LISTINGS_COLLECTION: &str = "listings";

const DEFAULT_QUERY_LIMIT: usize = 10;

/// Read/write access to listing documents.
///
/// Writes always stamp `timestamp` with the store's own clock.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one listing; `Ok(None)` when the document does not exist.
    async fn get_listing(&self, id: &ListingId) -> Result<Option<Listing>>;

    /// Create a listing under a freshly generated id.
    async fn create_listing(&self, fields: &ListingFields) -> Result<ListingId>;

    /// Overwrite the fields of an existing listing.
    ///
    /// Fails with `Error::NotFound` when the document does not exist.
    async fn update_listing(&self, id: &ListingId, fields: &ListingFields) -> Result<()>;

    /// List listings matching `query`, newest first.
    async fn query_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>>;
}

/// Filters for browsing listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub listing_type: Option<ListingType>,
    pub offers_only: bool,
    pub owner: Option<String>,
    pub limit: usize,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            listing_type: None,
            offers_only: false,
            owner: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl ListingQuery {
    /// Listings of one category (`/category/{type}`).
    #[must_use]
    pub fn category(listing_type: ListingType) -> Self {
        Self {
            listing_type: Some(listing_type),
            ..Self::default()
        }
    }

    /// Listings currently on offer.
    #[must_use]
    pub fn offers() -> Self {
        Self {
            offers_only: true,
            ..Self::default()
        }
    }

    /// Listings created by one user.
    #[must_use]
    pub fn owned_by(user_id: impl Into<String>) -> Self {
        Self {
            owner: Some(user_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn matches(&self, fields: &ListingFields) -> bool {
        self.listing_type
            .map_or(true, |listing_type| fields.listing_type == listing_type)
            && (!self.offers_only || fields.offer)
            && self
                .owner
                .as_deref()
                .map_or(true, |owner| fields.user_ref == owner)
    }
}
