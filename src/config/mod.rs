//! Configuration module for Quote-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! plus the environment variable overlay applied on top of them.
//! Every key has a default, so an empty file (or no file at all) is a valid
//! configuration.
//!
//! # Example
//!
//! ```no_run
//! use quote_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Starting at: {}", config.crawler.base_url);
//! ```

mod env;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackoffStrategy, Config, CrawlerConfig, OutputConfig, RetryConfig, UserAgentConfig,
};

pub use env::{apply_env_overrides, apply_overrides_from};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
