//! marketplace-core - Core library for House Marketplace
//!
//! This crate contains the listing models, the Firebase-backed collaborators
//! (auth, document store, object storage, geocoding), and the listing editor
//! used by every House Marketplace interface.

pub mod auth;
pub mod backend;
pub mod config;
pub mod editor;
pub mod error;
pub mod geocode;
pub mod models;
pub mod storage;
pub mod store;
pub mod util;

pub use backend::Backend;
pub use error::{Error, Result};
pub use models::{Listing, ListingFields, ListingId, ListingType};
