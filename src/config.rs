use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub browser: BrowserConfig,
    pub harvest: HarvestConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub user_agent: String,
    /// Budget for page navigation and browser calls, seconds.
    pub page_load_timeout: u64,
    /// Budget for the initial listing-row selector to materialize, seconds.
    pub selector_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    pub product_id: i64,
    pub product_url: String,
    /// Raw query string appended to the product URL, e.g. "sellerCountry=7".
    pub filter_query: String,
    /// Location tag stamped on every listing, fixed by the applied filter.
    pub location: String,
    /// Run sale-suspicion detection after a successful persist.
    pub detect_sales: bool,
    /// Settle after the row selector first appears, for JS rendering.
    pub initial_settle_ms: u64,
    pub click_settle_ms: u64,
    pub scroll_settle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://data/floorwatch.db".to_string(),
                max_connections: 5,
                acquire_timeout: 30,
            },
            browser: BrowserConfig {
                headless: true,
                chrome_path: None,
                user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36"
                    .to_string(),
                page_load_timeout: 60,
                selector_timeout: 30,
            },
            harvest: HarvestConfig {
                product_id: 1,
                product_url:
                    "https://www.cardmarket.com/en/Riftbound/Products/Box-Sets/Arcane-Box-Set"
                        .to_string(),
                filter_query: "sellerCountry=7".to_string(),
                location: "Germany".to_string(),
                detect_sales: false,
                initial_settle_ms: 5000,
                click_settle_ms: 3000,
                scroll_settle_ms: 2000,
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration in layers: built-in defaults, then an optional
    /// config file, then `FLOORWATCH__`-prefixed environment variables.
    ///
    /// Callers apply CLI overrides on the returned value and run
    /// [`AppConfig::validate`] afterwards, so that every source has been
    /// merged before validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name("config/local").required(false)),
        };

        let merged = builder
            .add_source(Environment::with_prefix("FLOORWATCH").separator("__"))
            .build()?;

        merged.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Message("Database URL must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "Database max_connections must be greater than 0".into(),
            ));
        }

        if Url::parse(&self.harvest.product_url).is_err() {
            return Err(ConfigError::Message("Invalid product URL format".into()));
        }

        if self.browser.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Browser user agent must not be empty".into()));
        }

        if self.browser.page_load_timeout == 0 || self.browser.selector_timeout == 0 {
            return Err(ConfigError::Message(
                "Browser timeouts must be greater than 0".into(),
            ));
        }

        if self.api.port == 0 {
            return Err(ConfigError::Message("API port must be greater than 0".into()));
        }

        Ok(())
    }
}
