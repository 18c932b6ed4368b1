//! Data models for House Marketplace

mod image;
mod listing;
mod route;

pub use image::ImageFile;
pub use listing::{Listing, ListingFields, ListingId, ListingType, MAX_LISTING_IMAGES};
pub use route::Route;
