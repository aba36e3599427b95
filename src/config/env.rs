//! Environment overlay
//!
//! Applied on top of the TOML file (or the defaults) and below command-line
//! flags. Unset or blank variables leave the current value alone. Durations
//! are given in seconds and may be fractional.

use crate::config::types::Config;
use crate::ConfigError;

pub const BASE_URL: &str = "BASE_URL";
pub const REQUEST_TIMEOUT_SECONDS: &str = "REQUEST_TIMEOUT_SECONDS";
pub const MAX_CONCURRENT_REQUESTS: &str = "MAX_CONCURRENT_REQUESTS";
pub const RATE_LIMIT_DELAY_SECONDS: &str = "RATE_LIMIT_DELAY_SECONDS";
pub const USER_AGENT: &str = "USER_AGENT";
pub const OUTPUT_CSV: &str = "OUTPUT_CSV";
pub const OUTPUT_JSON: &str = "OUTPUT_JSON";

/// Applies overrides from the process environment
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Applies overrides from any key lookup
///
/// # Returns
///
/// * `Ok(())` - Every set variable was applied
/// * `Err(ConfigError::Validation)` - A numeric variable could not be parsed
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    if let Some(url) = get(BASE_URL) {
        config.crawler.base_url = url;
    }
    if let Some(value) = get(REQUEST_TIMEOUT_SECONDS) {
        config.crawler.request_timeout_ms = seconds_to_ms(REQUEST_TIMEOUT_SECONDS, &value)?;
    }
    if let Some(value) = get(MAX_CONCURRENT_REQUESTS) {
        config.crawler.max_concurrent_requests = value.parse().map_err(|_| {
            ConfigError::Validation(format!(
                "{} must be a whole number, got '{}'",
                MAX_CONCURRENT_REQUESTS, value
            ))
        })?;
    }
    if let Some(value) = get(RATE_LIMIT_DELAY_SECONDS) {
        config.crawler.rate_limit_delay_ms = seconds_to_ms(RATE_LIMIT_DELAY_SECONDS, &value)?;
    }
    if let Some(header) = get(USER_AGENT) {
        config.user_agent.header = Some(header);
    }
    if let Some(path) = get(OUTPUT_CSV) {
        config.output.csv_path = path;
    }
    if let Some(path) = get(OUTPUT_JSON) {
        config.output.json_path = path;
    }

    Ok(())
}

fn seconds_to_ms(key: &str, value: &str) -> Result<u64, ConfigError> {
    let seconds: f64 = value.parse().map_err(|_| {
        ConfigError::Validation(format!("{} must be a number of seconds, got '{}'", key, value))
    })?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} cannot be negative, got '{}'",
            key, value
        )));
    }

    Ok((seconds * 1000.0).round() as u64)
}
