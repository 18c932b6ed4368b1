//! Backend errors shared by the listing collaborators.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure talking to Firebase or decoding what it returned.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The listing document does not exist.
    #[error("Listing not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Firestore rejected a request or returned a malformed document.
    #[error("Document store error: {0}")]
    Store(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Geocoding API failure other than "no match".
    #[error("Geocoding error: {0}")]
    Geocoding(String),
}
