use thiserror::Error;

use super::EditorPhase;
use crate::models::{ListingId, Route, MAX_LISTING_IMAGES};

pub type EditorResult<T> = std::result::Result<T, EditorError>;

/// Rejections raised by the listing editor.
///
/// `Display` is the user-facing notice.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Discounted price needs to be lower than the Regular price")]
    DiscountNotLower,

    #[error("Max {MAX_LISTING_IMAGES} images")]
    TooManyImages(usize),

    #[error("{0}")]
    InvalidField(String),

    #[error("Please attach at least one image")]
    MissingImages,

    #[error("Please enter a correct address")]
    AddressNotFound,

    #[error("Could not look up the address")]
    AddressLookup(#[source] crate::Error),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Invalid value for {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error("Listing does not exist")]
    NotFound(ListingId),

    #[error("Could not load the listing")]
    LoadFailed(#[source] crate::Error),

    #[error("Please sign in to continue")]
    NotSignedIn,

    #[error("You cannot edit the selected listing")]
    NotOwner,

    #[error("Images not uploaded")]
    UploadFailed(#[source] crate::Error),

    #[error("Could not save the listing")]
    WriteFailed(#[source] crate::Error),

    #[error("Editor is {actual}, expected {expected}")]
    InvalidState {
        actual: EditorPhase,
        expected: &'static str,
    },
}

impl EditorError {
    /// Message shown to the user.
    #[must_use]
    pub fn notice(&self) -> String {
        self.to_string()
    }

    /// Where the client must navigate after this error, if anywhere.
    #[must_use]
    pub fn redirect(&self) -> Option<Route> {
        match self {
            Self::NotFound(_) | Self::NotOwner => Some(Route::Home),
            Self::NotSignedIn => Some(Route::SignIn),
            _ => None,
        }
    }

    /// Whether the draft failed a check before anything was sent.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DiscountNotLower
                | Self::TooManyImages(_)
                | Self::InvalidField(_)
                | Self::MissingImages
                | Self::AddressNotFound
        )
    }
}
