use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted listing row, owned exclusively by its parent scrape.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Listing {
    pub id: i64,
    pub scrape_id: i64,
    pub seller: String,
    pub price: f64,
    pub quantity: i64,
    pub location: String,
}

/// A validated listing extracted from the page, transient until it is
/// persisted as a child of a scrape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewListing {
    pub seller: String,
    pub price: f64,
    pub quantity: i64,
    pub location: String,
}
