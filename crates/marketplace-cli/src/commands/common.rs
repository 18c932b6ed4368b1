use std::path::Path;

use chrono::Utc;
use marketplace_core::auth::SessionHandle;
use marketplace_core::config::BackendConfig;
use marketplace_core::editor::{FieldInput, ListingEditor};
use marketplace_core::models::ImageFile;
use marketplace_core::{Backend, Listing, ListingId, ListingType};
use serde::Serialize;

use crate::auth::{AuthSession, FirebaseAuthService};
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Backend handle for the resolved profile plus its restored session.
pub struct Connection {
    pub profile_name: String,
    pub backend: Backend,
    pub auth: FirebaseAuthService,
    pub auth_session: Option<AuthSession>,
}

impl Connection {
    pub fn require_user_id(&self) -> Result<String, CliError> {
        self.backend
            .session()
            .current_user_id()
            .ok_or(CliError::NotSignedIn)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingListItem {
    pub id: String,
    #[serde(rename = "type")]
    pub listing_type: String,
    pub name: String,
    pub address: String,
    pub price: f64,
    pub offer: bool,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub cover_image: Option<String>,
    pub timestamp: Option<String>,
    pub relative_time: String,
}

pub fn resolve_backend_config(
    config: &CliProfilesConfig,
    profile_name: &str,
) -> Result<BackendConfig, CliError> {
    if let Some(profile) = config.profile(profile_name) {
        if let Some(backend_config) = profile
            .backend_config()
            .map_err(|error| CliError::Config(format!("Profile '{profile_name}': {error}")))?
        {
            return Ok(backend_config);
        }
    }

    BackendConfig::from_env()?.ok_or(CliError::NotConfigured)
}

pub fn auth_error(error: impl std::fmt::Display) -> CliError {
    CliError::Auth(error.to_string())
}

pub async fn connect(global_profile: Option<&str>) -> Result<Connection, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let backend_config = resolve_backend_config(&config, &profile_name)?;

    let session = SessionHandle::new();
    let auth = FirebaseAuthService::new(&profile_name, &backend_config.api_key, session.clone())
        .map_err(auth_error)?;
    let auth_session = auth.restore_session().await.map_err(auth_error)?;
    let backend = Backend::firebase(
        &backend_config,
        session,
        auth_session.as_ref().map(|stored| stored.id_token.as_str()),
    )?;

    tracing::debug!("Connected profile '{}' to {:?}", profile_name, backend);
    Ok(Connection {
        profile_name,
        backend,
        auth,
        auth_session,
    })
}

pub fn parse_listing_id(id: &str) -> Result<ListingId, CliError> {
    if id.trim().is_empty() {
        return Err(CliError::EmptyListingId);
    }
    Ok(id.parse::<ListingId>()?)
}

/// Split `field=value`; the value may itself contain `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), CliError> {
    let Some((field, value)) = raw.split_once('=') else {
        return Err(CliError::InvalidAssignment(raw.to_string()));
    };
    let field = field.trim();
    if field.is_empty() {
        return Err(CliError::InvalidAssignment(raw.to_string()));
    }
    Ok((field.to_string(), value.trim().to_string()))
}

pub fn apply_assignments(editor: &mut ListingEditor, assignments: &[String]) -> Result<(), CliError> {
    for raw in assignments {
        let (field, value) = parse_assignment(raw)?;
        editor.apply(FieldInput::value(field, value))?;
    }
    Ok(())
}

pub fn read_image(path: &Path) -> Result<ImageFile, CliError> {
    let invalid = |reason: String| CliError::InvalidImage {
        path: path.display().to_string(),
        reason,
    };
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| invalid("file name is not valid UTF-8".to_string()))?;
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let bytes = std::fs::read(path)?;

    ImageFile::new(name, content_type, bytes).map_err(|error| invalid(error.to_string()))
}

pub fn read_images(paths: &[impl AsRef<Path>]) -> Result<Vec<ImageFile>, CliError> {
    paths.iter().map(|path| read_image(path.as_ref())).collect()
}

pub fn listing_to_list_item(listing: &Listing) -> ListingListItem {
    let now_ms = Utc::now().timestamp_millis();
    ListingListItem {
        id: listing.id.to_string(),
        listing_type: listing.fields.listing_type.to_string(),
        name: listing.fields.name.clone(),
        address: listing.fields.address.clone(),
        price: listing.fields.effective_price(),
        offer: listing.fields.offer,
        bedrooms: listing.fields.bedrooms,
        bathrooms: listing.fields.bathrooms,
        cover_image: listing.cover_image().map(ToOwned::to_owned),
        timestamp: listing.timestamp.map(|timestamp| timestamp.to_rfc3339()),
        relative_time: listing.timestamp.map_or_else(
            || "-".to_string(),
            |timestamp| format_relative_time(timestamp.timestamp_millis(), now_ms),
        ),
    }
}

pub fn format_listing_lines(listings: &[Listing]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    listings
        .iter()
        .map(|listing| {
            let fields = &listing.fields;
            let name = truncate(&fields.name, 32);
            let price = format_price(fields.effective_price());
            let suffix = if fields.listing_type == ListingType::Rent {
                " / month"
            } else {
                ""
            };
            let offer = if fields.offer { "  [offer]" } else { "" };
            let relative_time = listing.timestamp.map_or_else(
                || "-".to_string(),
                |timestamp| format_relative_time(timestamp.timestamp_millis(), now_ms),
            );
            format!(
                "{:<20}  {:<4}  {name:<32}  ${price}{suffix}  {relative_time}{offer}",
                listing.id.as_str(),
                fields.listing_type.as_str(),
            )
        })
        .collect()
}

pub fn format_listing_detail(listing: &Listing) -> Vec<String> {
    let fields = &listing.fields;
    let yes_no = |flag: bool| if flag { "yes" } else { "no" };
    let mut lines = vec![
        format!("{}  ({})", fields.name, listing.id),
        format!("Type:       {}", fields.listing_type),
        format!("Address:    {}", fields.address),
        format!(
            "Location:   {:.6}, {:.6}",
            fields.latitude, fields.longitude
        ),
        format!("Bedrooms:   {}", fields.bedrooms),
        format!("Bathrooms:  {}", fields.bathrooms),
        format!("Parking:    {}", yes_no(fields.parking)),
        format!("Furnished:  {}", yes_no(fields.furnished)),
        format!("Price:      ${}", format_price(fields.regular_price)),
    ];
    if let (true, Some(discounted)) = (fields.offer, fields.discounted_price) {
        lines.push(format!(
            "Offer:      ${} (${} off)",
            format_price(discounted),
            format_price(fields.regular_price - discounted)
        ));
    }
    for (index, url) in fields.image_urls.iter().enumerate() {
        let label = if index == 0 { "Cover:" } else { "Image:" };
        lines.push(format!("{label:<11} {url}"));
    }
    lines
}

/// Whole amounts with thousands separators, e.g. `1,250,000`.
pub fn format_price(amount: f64) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let whole = amount.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if whole < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut truncated = text
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}
