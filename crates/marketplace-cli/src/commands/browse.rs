use marketplace_core::store::ListingQuery;
use marketplace_core::ListingType;

use crate::commands::common::{
    connect, format_listing_detail, format_listing_lines, listing_to_list_item, parse_listing_id,
    ListingListItem,
};
use crate::error::CliError;

pub struct ListOptions {
    pub listing_type: Option<ListingType>,
    pub offers: bool,
    pub mine: bool,
    pub limit: usize,
    pub json: bool,
}

pub fn build_query(options: &ListOptions, user_id: Option<String>) -> ListingQuery {
    let mut query = ListingQuery::default().with_limit(options.limit);
    query.listing_type = options.listing_type;
    query.offers_only = options.offers;
    query.owner = user_id;
    query
}

pub async fn run_list(options: ListOptions, global_profile: Option<&str>) -> Result<(), CliError> {
    let connection = connect(global_profile).await?;
    let owner = if options.mine {
        Some(connection.require_user_id()?)
    } else {
        None
    };

    let listings = connection
        .backend
        .browse(&build_query(&options, owner))
        .await?;

    if options.json {
        let items = listings
            .iter()
            .map(listing_to_list_item)
            .collect::<Vec<ListingListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if listings.is_empty() {
        println!("No listings found");
    } else {
        for line in format_listing_lines(&listings) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_show(id: &str, as_json: bool, global_profile: Option<&str>) -> Result<(), CliError> {
    let listing_id = parse_listing_id(id)?;
    let connection = connect(global_profile).await?;
    let listing = connection
        .backend
        .listing(&listing_id)
        .await?
        .ok_or_else(|| CliError::ListingNotFound(listing_id.to_string()))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for line in format_listing_detail(&listing) {
            println!("{line}");
        }
    }

    Ok(())
}
