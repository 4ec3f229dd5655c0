//! Directory Scout: a business-directory contact crawler
//!
//! This crate crawls a paginated directory search result set per search
//! category, visits each listing's detail page concurrently, and appends
//! deduplicated contact records to an append-only CSV store. Repeated runs
//! are idempotent: categories already present in the store are skipped and
//! duplicate company names are filtered before append.

pub mod config;
pub mod crawler;
pub mod driver;
pub mod extract;
pub mod record;
pub mod store;

use thiserror::Error;

/// Main error type for Directory Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Directory Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use record::{CompanyRecord, ListingRef};
pub use store::CsvStore;
