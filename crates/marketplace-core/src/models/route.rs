//! Navigation targets produced by listing flows.

use std::fmt;

use super::{ListingId, ListingType};

/// Where a client should navigate after a flow finishes or is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Listings root.
    Home,
    SignIn,
    /// Detail page of a listing within its category.
    Category {
        listing_type: ListingType,
        listing_id: ListingId,
    },
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str("/"),
            Self::SignIn => f.write_str("/sign-in"),
            Self::Category {
                listing_type,
                listing_id,
            } => write!(f, "/category/{listing_type}/{listing_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_route_renders_type_and_id() {
        let route = Route::Category {
            listing_type: ListingType::Sale,
            listing_id: "abc123".parse().unwrap(),
        };
        assert_eq!(route.to_string(), "/category/sale/abc123");
        assert_eq!(Route::Home.to_string(), "/");
        assert_eq!(Route::SignIn.to_string(), "/sign-in");
    }
}
