use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out waiting for '{selector}' after {timeout_secs}s")]
    Timeout { selector: String, timeout_secs: u64 },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Parsing error: {message}")]
    Parse { message: String },
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
