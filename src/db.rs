use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::Result;
use crate::config::DatabaseConfig;

const CREATE_SCRAPES: &str = r#"
CREATE TABLE IF NOT EXISTS scrapes (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id      INTEGER NOT NULL,
    total_listings  INTEGER NOT NULL,
    floor_price     REAL NOT NULL,
    filters_applied TEXT NOT NULL,
    created_at      TEXT NOT NULL
)
"#;

const CREATE_LISTINGS: &str = r#"
CREATE TABLE IF NOT EXISTS listings (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    scrape_id INTEGER NOT NULL REFERENCES scrapes(id),
    seller    TEXT NOT NULL,
    price     REAL NOT NULL,
    quantity  INTEGER NOT NULL,
    location  TEXT NOT NULL
)
"#;

const CREATE_SUSPECTED_SALES: &str = r#"
CREATE TABLE IF NOT EXISTS suspected_sales (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id  INTEGER NOT NULL,
    detected_at TEXT NOT NULL,
    seller      TEXT NOT NULL,
    price       REAL NOT NULL,
    confidence  TEXT NOT NULL,
    reasoning   TEXT NOT NULL
)
"#;

/// Opens the SQLite pool and ensures the schema exists.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout))
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    debug!(url = %config.url, "database ready");
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::query(CREATE_SCRAPES).execute(pool).await?;
    sqlx::query(CREATE_LISTINGS).execute(pool).await?;
    sqlx::query(CREATE_SUSPECTED_SALES).execute(pool).await?;
    Ok(())
}

#[cfg(test)]
pub async fn connect_in_memory() -> Result<SqlitePool> {
    // A shared-nothing :memory: database exists per connection, so tests
    // must hold the pool at a single connection.
    connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        acquire_timeout: 5,
    })
    .await
}
