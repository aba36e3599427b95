//! Quote-Harvest: a polite quote and author crawler
//!
//! This crate walks a paginated listing of quotes, resolves the author detail
//! page behind each quote exactly once per run, and hands the ordered record
//! set to CSV and JSON writers.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Quote-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A listing page could not be fetched; the pagination chain is broken
    #[error(
        "Page fetch failed at {url} after {pages_completed} pages ({records_accumulated} records discarded): {source}"
    )]
    PageFetch {
        url: String,
        source: crawler::FetchError,
        pages_completed: u64,
        records_accumulated: usize,
    },

    #[error("HTML parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
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

/// URL-specific errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// A page whose shape did not match the expected selectors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unexpected page shape at {url}: {message}")]
pub struct ParseError {
    pub url: String,
    pub message: String,
}

/// Result type alias for Quote-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator, CrawlReport};
pub use url::Reference;
