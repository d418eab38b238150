use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One harvest run's persisted snapshot. Immutable once committed; a scrape
/// is only ever written together with at least one valid listing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Scrape {
    pub id: i64,
    pub product_id: i64,
    pub total_listings: i64,
    pub floor_price: f64,
    pub filters_applied: String,
    pub created_at: DateTime<Utc>,
}
