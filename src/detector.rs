use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::models::{Confidence, Listing, SuspectedSale};
use crate::Result;

const SUSPECTED_SALE_RATIONALE: &str =
    "seller absent from current run, previously in the cheapest price quartile";

/// Outcome of one detection pass. Fewer than two persisted scrapes is a
/// reported no-op, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    InsufficientHistory,
    Analyzed(Vec<SuspectedSale>),
}

/// The cheapest of four equal-sized rank partitions, `NTILE(4)` style:
/// with `n` not divisible by four, the leading partitions take the extra
/// members, so the cheapest quartile holds `ceil(n / 4)` listings.
/// Callers pass listings already ranked by ascending price; boundary ties
/// keep their ordinal rank with no further tie-break.
pub fn cheapest_quartile(ranked: &[Listing]) -> &[Listing] {
    let n = ranked.len();
    let len = n / 4 + usize::from(n % 4 != 0);
    &ranked[..len]
}

/// Compares the two most recent scrapes of a product and flags likely
/// completed sales: a competitively priced listing whose seller vanished is
/// a stronger purchase signal than a generic delisting, and restricting to
/// the cheapest quartile bounds false positives.
pub struct SaleSuspicionDetector {
    pool: SqlitePool,
}

impl SaleSuspicionDetector {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn detect(&self, product_id: i64) -> Result<DetectionOutcome> {
        let scrape_ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM scrapes
            WHERE product_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT 2
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        if scrape_ids.len() < 2 {
            info!(product_id, "insufficient history for sale analysis");
            return Ok(DetectionOutcome::InsufficientHistory);
        }
        let (current_id, previous_id) = (scrape_ids[0], scrape_ids[1]);

        let previous: Vec<Listing> = sqlx::query_as(
            r#"
            SELECT id, scrape_id, seller, price, quantity, location
            FROM listings WHERE scrape_id = ?1
            ORDER BY price ASC, id ASC
            "#,
        )
        .bind(previous_id)
        .fetch_all(&self.pool)
        .await?;

        let current_sellers: HashSet<String> =
            sqlx::query_scalar("SELECT DISTINCT seller FROM listings WHERE scrape_id = ?1")
                .bind(current_id)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .collect();

        let detected_at = Utc::now();
        let mut suspected = Vec::new();
        let mut tx = self.pool.begin().await?;

        // Every vanished cheapest-quartile listing yields its own record,
        // even when one seller had several.
        for listing in cheapest_quartile(&previous) {
            if current_sellers.contains(&listing.seller) {
                continue;
            }

            let id = sqlx::query(
                r#"
                INSERT INTO suspected_sales
                    (product_id, detected_at, seller, price, confidence, reasoning)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(product_id)
            .bind(detected_at)
            .bind(&listing.seller)
            .bind(listing.price)
            .bind(Confidence::Medium)
            .bind(SUSPECTED_SALE_RATIONALE)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            warn!(seller = %listing.seller, price = listing.price, "suspected sale");
            suspected.push(SuspectedSale {
                id,
                product_id,
                detected_at,
                seller: listing.seller.clone(),
                price: listing.price,
                confidence: Confidence::Medium,
                reasoning: SUSPECTED_SALE_RATIONALE.to_string(),
            });
        }

        tx.commit().await?;
        Ok(DetectionOutcome::Analyzed(suspected))
    }
}
