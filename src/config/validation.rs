use crate::config::types::{Config, DatabaseConfig, FetchConfig, ForumConfig, RangeConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound for the request delay and the backoff base (seconds)
const MAX_DELAY_SECS: f64 = 3600.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_forum_config(&config.forum)?;
    validate_database_config(&config.database)?;
    validate_range_config(&config.range)?;
    validate_fetch_config(&config.fetch)?;
    Ok(())
}

/// Validates the forum base URL
fn validate_forum_config(config: &ForumConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    Ok(())
}

fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the thread id range
fn validate_range_config(config: &RangeConfig) -> Result<(), ConfigError> {
    if config.start_tid < 1 {
        return Err(ConfigError::Validation(format!(
            "start-tid must be >= 1, got {}",
            config.start_tid
        )));
    }

    if config.start_tid > config.end_tid {
        return Err(ConfigError::Validation(format!(
            "start-tid ({}) must not exceed end-tid ({})",
            config.start_tid, config.end_tid
        )));
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    validate_delay("request-delay-secs", config.request_delay_secs)?;
    validate_delay("backoff-base-secs", config.backoff_base_secs)?;

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max-retries must be >= 1".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Delays must be finite, non-negative and at most `MAX_DELAY_SECS`
fn validate_delay(key: &str, secs: f64) -> Result<(), ConfigError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be a non-negative number, got {}",
            key, secs
        )));
    }

    if secs > MAX_DELAY_SECS {
        return Err(ConfigError::Validation(format!(
            "{} must be at most {}, got {}",
            key, MAX_DELAY_SECS, secs
        )));
    }

    Ok(())
}
