use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::Confidence;

/// An inferred completed transaction, derived from a seller's disappearance
/// out of the cheapest price quartile. Write-once; never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct SuspectedSale {
    pub id: i64,
    pub product_id: i64,
    pub detected_at: DateTime<Utc>,
    pub seller: String,
    pub price: f64,
    pub confidence: Confidence,
    pub reasoning: String,
}
