use std::io;

use marketplace_core::editor::EditorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] marketplace_core::Error),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Listing ID cannot be empty")]
    EmptyListingId,
    #[error("Listing not found: {0}")]
    ListingNotFound(String),
    #[error("Invalid field assignment '{0}'. Use FIELD=VALUE, e.g. regularPrice=1500")]
    InvalidAssignment(String),
    #[error("Invalid image {path}: {reason}")]
    InvalidImage { path: String, reason: String },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error(
        "Firebase is not configured. Run `marketplace config init` or set FIREBASE_API_KEY, FIREBASE_PROJECT_ID and FIREBASE_STORAGE_BUCKET."
    )]
    NotConfigured,
    #[error("Not signed in. Run `marketplace auth login --email <email> --password <password>`.")]
    NotSignedIn,
}
