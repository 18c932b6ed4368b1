//! In-process document store, used by tests and offline demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{DocumentStore, ListingQuery};
use crate::models::{Listing, ListingFields, ListingId};
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct StoredListing {
    fields: ListingFields,
    timestamp: DateTime<Utc>,
    sequence: u64,
}

#[derive(Debug, Default)]
struct Documents {
    listings: HashMap<ListingId, StoredListing>,
    next_sequence: u64,
    writes: usize,
}

impl Documents {
    fn stamp(&mut self) -> (DateTime<Utc>, u64) {
        self.next_sequence += 1;
        self.writes += 1;
        (Utc::now(), self.next_sequence)
    }
}

/// `DocumentStore` kept in memory; the local clock plays the server clock.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<Documents>,
    reject_writes: AtomicBool,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail, simulating a backend outage.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub async fn write_count(&self) -> usize {
        self.documents.lock().await.writes
    }

    fn check_writable(&self) -> Result<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(Error::Store("writes are currently rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_listing(&self, id: &ListingId) -> Result<Option<Listing>> {
        let documents = self.documents.lock().await;
        Ok(documents.listings.get(id).map(|stored| Listing {
            id: id.clone(),
            fields: stored.fields.clone(),
            timestamp: Some(stored.timestamp),
        }))
    }

    async fn create_listing(&self, fields: &ListingFields) -> Result<ListingId> {
        self.check_writable()?;
        let mut documents = self.documents.lock().await;

        let mut id = ListingId::generate();
        while documents.listings.contains_key(&id) {
            id = ListingId::generate();
        }

        let (timestamp, sequence) = documents.stamp();
        documents.listings.insert(
            id.clone(),
            StoredListing {
                fields: fields.clone(),
                timestamp,
                sequence,
            },
        );
        Ok(id)
    }

    async fn update_listing(&self, id: &ListingId, fields: &ListingFields) -> Result<()> {
        self.check_writable()?;
        let mut documents = self.documents.lock().await;
        if !documents.listings.contains_key(id) {
            return Err(Error::NotFound(id.to_string()));
        }

        let (timestamp, sequence) = documents.stamp();
        documents.listings.insert(
            id.clone(),
            StoredListing {
                fields: fields.clone(),
                timestamp,
                sequence,
            },
        );
        Ok(())
    }

    async fn query_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        let documents = self.documents.lock().await;
        let mut matching = documents
            .listings
            .iter()
            .filter(|(_, stored)| query.matches(&stored.fields))
            .collect::<Vec<_>>();
        matching.sort_by(|(_, a), (_, b)| {
            (b.timestamp, b.sequence).cmp(&(a.timestamp, a.sequence))
        });

        Ok(matching
            .into_iter()
            .take(query.limit)
            .map(|(id, stored)| Listing {
                id: id.clone(),
                fields: stored.fields.clone(),
                timestamp: Some(stored.timestamp),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingType;

    fn fields(name: &str, listing_type: ListingType, offer: bool, owner: &str) -> ListingFields {
        ListingFields {
            listing_type,
            name: name.to_string(),
            bedrooms: 1,
            bathrooms: 1,
            parking: false,
            furnished: false,
            address: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            offer,
            regular_price: 100.0,
            discounted_price: offer.then_some(90.0),
            image_urls: Vec::new(),
            user_ref: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryDocumentStore::new();
        let id = store
            .create_listing(&fields("First listing", ListingType::Rent, false, "a"))
            .await
            .unwrap();

        let fetched = store.get_listing(&id).await.unwrap().unwrap();
        assert_eq!(fetched.fields.name, "First listing");
        assert!(fetched.timestamp.is_some());
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = MemoryDocumentStore::new();
        let missing: ListingId = "missing".parse().unwrap();
        assert!(store.get_listing(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryDocumentStore::new();
        let missing: ListingId = "missing".parse().unwrap();
        let err = store
            .update_listing(&missing, &fields("Nope", ListingType::Rent, false, "a"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_query_filters_and_orders_newest_first() {
        let store = MemoryDocumentStore::new();
        store
            .create_listing(&fields("Rent one", ListingType::Rent, false, "a"))
            .await
            .unwrap();
        store
            .create_listing(&fields("Sale one", ListingType::Sale, true, "b"))
            .await
            .unwrap();
        store
            .create_listing(&fields("Rent two", ListingType::Rent, true, "a"))
            .await
            .unwrap();

        let rent = store
            .query_listings(&ListingQuery::category(ListingType::Rent))
            .await
            .unwrap();
        let names: Vec<_> = rent.iter().map(|l| l.fields.name.as_str()).collect();
        assert_eq!(names, vec!["Rent two", "Rent one"]);

        let offers = store.query_listings(&ListingQuery::offers()).await.unwrap();
        assert_eq!(offers.len(), 2);

        let owned = store
            .query_listings(&ListingQuery::owned_by("b"))
            .await
            .unwrap();
        assert_eq!(owned.len(), 1);

        let limited = store
            .query_listings(&ListingQuery::default().with_limit(1))
            .await
            .unwrap();
        assert_eq!(limited[0].fields.name, "Rent two");
    }

    #[tokio::test]
    async fn test_rejected_writes_leave_store_untouched() {
        let store = MemoryDocumentStore::new();
        store.reject_writes(true);
        assert!(store
            .create_listing(&fields("Blocked", ListingType::Rent, false, "a"))
            .await
            .is_err());
        assert_eq!(store.write_count().await, 0);
    }
}
