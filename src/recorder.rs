use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::models::{FilterSignature, Listing, NewListing, Scrape};
use crate::Result;

/// Outcome of one recording attempt. An empty run is a reported outcome,
/// not an error: nothing is written when no valid listing exists.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Empty,
    Recorded(Scrape),
}

/// Exact minimum price across a listing sequence; `None` when empty.
pub fn floor_price(listings: &[NewListing]) -> Option<f64> {
    listings.iter().map(|listing| listing.price).reduce(f64::min)
}

/// Computes the floor price and persists one run as a scrape with its
/// listings, atomically.
pub struct ScrapeRecorder {
    pool: SqlitePool,
}

impl ScrapeRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persists the run inside a single transaction: either the scrape and
    /// all of its listings commit, or none do. A partially written scrape is
    /// never visible to readers.
    pub async fn record(
        &self,
        product_id: i64,
        filters: &FilterSignature,
        listings: &[NewListing],
    ) -> Result<RecordOutcome> {
        let Some(floor) = floor_price(listings) else {
            info!(product_id, "no valid listings, skipping persist");
            return Ok(RecordOutcome::Empty);
        };

        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        let scrape_id = sqlx::query(
            r#"
            INSERT INTO scrapes (product_id, total_listings, floor_price, filters_applied, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(product_id)
        .bind(listings.len() as i64)
        .bind(floor)
        .bind(filters.as_str())
        .bind(created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for listing in listings {
            sqlx::query(
                r#"
                INSERT INTO listings (scrape_id, seller, price, quantity, location)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(scrape_id)
            .bind(&listing.seller)
            .bind(listing.price)
            .bind(listing.quantity)
            .bind(&listing.location)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(scrape_id, floor, count = listings.len(), "scrape recorded");
        Ok(RecordOutcome::Recorded(Scrape {
            id: scrape_id,
            product_id,
            total_listings: listings.len() as i64,
            floor_price: floor,
            filters_applied: filters.as_str().to_string(),
            created_at,
        }))
    }

    pub async fn fetch_scrape(&self, scrape_id: i64) -> Result<Option<Scrape>> {
        let scrape = sqlx::query_as::<_, Scrape>(
            r#"
            SELECT id, product_id, total_listings, floor_price, filters_applied, created_at
            FROM scrapes WHERE id = ?1
            "#,
        )
        .bind(scrape_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(scrape)
    }

    pub async fn fetch_listings(&self, scrape_id: i64) -> Result<Vec<Listing>> {
        let listings = sqlx::query_as::<_, Listing>(
            r#"
            SELECT id, scrape_id, seller, price, quantity, location
            FROM listings WHERE scrape_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(scrape_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn listing(seller: &str, price: f64) -> NewListing {
        NewListing {
            seller: seller.to_string(),
            price,
            quantity: 1,
            location: "Germany".to_string(),
        }
    }

    #[test]
    fn test_floor_price_is_exact_minimum() {
        let listings = vec![listing("a", 4.5), listing("b", 2.25), listing("c", 9.0)];
        assert_eq!(floor_price(&listings), Some(2.25));
    }

    #[test]
    fn test_floor_price_of_empty_sequence_is_none() {
        assert_eq!(floor_price(&[]), None);
    }

    #[tokio::test]
    async fn test_empty_run_writes_nothing() {
        let pool = db::connect_in_memory().await.unwrap();
        let recorder = ScrapeRecorder::new(pool.clone());
        let filters = FilterSignature::parse("sellerCountry=7");

        let outcome = recorder.record(1, &filters, &[]).await.unwrap();

        assert_eq!(outcome, RecordOutcome::Empty);
        let scrapes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scrapes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(scrapes, 0);
    }

    #[tokio::test]
    async fn test_recorded_scrape_roundtrips_with_all_listings() {
        let pool = db::connect_in_memory().await.unwrap();
        let recorder = ScrapeRecorder::new(pool);
        let filters = FilterSignature::parse("sellerCountry=7");
        let listings = vec![
            NewListing {
                seller: "alpha".to_string(),
                price: 3.5,
                quantity: 2,
                location: "Germany".to_string(),
            },
            NewListing {
                seller: "beta".to_string(),
                price: 2.0,
                quantity: 1,
                location: "Germany".to_string(),
            },
            NewListing {
                seller: "gamma".to_string(),
                price: 8.75,
                quantity: 4,
                location: "Germany".to_string(),
            },
        ];

        let outcome = recorder.record(42, &filters, &listings).await.unwrap();
        let RecordOutcome::Recorded(scrape) = outcome else {
            panic!("expected a recorded scrape");
        };

        assert_eq!(scrape.product_id, 42);
        assert_eq!(scrape.total_listings, 3);
        assert_eq!(scrape.floor_price, 2.0);
        assert_eq!(scrape.filters_applied, "sellerCountry=7");

        let stored = recorder.fetch_scrape(scrape.id).await.unwrap().unwrap();
        assert_eq!(stored.floor_price, 2.0);
        assert_eq!(stored.total_listings, 3);

        let stored_listings = recorder.fetch_listings(scrape.id).await.unwrap();
        assert_eq!(stored_listings.len(), 3);
        for (stored, original) in stored_listings.iter().zip(&listings) {
            assert_eq!(stored.scrape_id, scrape.id);
            assert_eq!(stored.seller, original.seller);
            assert_eq!(stored.price, original.price);
            assert_eq!(stored.quantity, original.quantity);
            assert_eq!(stored.location, original.location);
        }
    }

    #[tokio::test]
    async fn test_scrapes_for_different_products_stay_disjoint() {
        let pool = db::connect_in_memory().await.unwrap();
        let recorder = ScrapeRecorder::new(pool.clone());
        let filters = FilterSignature::parse("sellerCountry=7");

        recorder
            .record(1, &filters, &[listing("alpha", 1.0)])
            .await
            .unwrap();
        recorder
            .record(2, &filters, &[listing("beta", 2.0)])
            .await
            .unwrap();

        let product_one: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM scrapes WHERE product_id = 1")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(product_one, 1);
    }
}
