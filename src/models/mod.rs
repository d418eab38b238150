use serde::{Deserialize, Serialize};
use std::fmt;

pub mod filter;
pub mod listing;
pub mod scrape;
pub mod suspected_sale;

// Re-exports for convenience
pub use filter::*;
pub use listing::*;
pub use scrape::*;
pub use suspected_sale::*;

/// How strongly a disappearance pattern suggests a completed sale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT")]
pub enum Confidence {
    #[sqlx(rename = "low")]
    Low,
    #[sqlx(rename = "medium")]
    Medium,
    #[sqlx(rename = "high")]
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}
