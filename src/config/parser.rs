use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Loads the effective configuration
///
/// Defaults are overlaid by the TOML file at `path` (when given), then by
/// environment variables, and the result is validated.
///
/// # Arguments
///
/// * `path` - Optional path to a TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;

    Ok(config)
}

/// Reads and parses a TOML configuration file without validating it
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Overlays environment variables onto `config`
///
/// `lookup` resolves a variable name; empty values are treated as unset.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(path) = get("DB_PATH") {
        config.database.path = PathBuf::from(path);
    }
    if let Some(url) = get("BASE_URL") {
        config.forum.base_url = url;
    }
    if let Some(start) = parse_env(&get, "START_TID")? {
        config.range.start_tid = start;
    }
    if let Some(end) = parse_env(&get, "END_TID")? {
        config.range.end_tid = end;
    }
    if let Some(delay) = parse_env(&get, "DELAY_BETWEEN_REQUESTS")? {
        config.fetch.request_delay_secs = delay;
    }
    if let Some(retries) = parse_env(&get, "MAX_RETRIES")? {
        config.fetch.max_retries = retries;
    }
    if let Some(timeout) = parse_env(&get, "TIMEOUT")? {
        config.fetch.timeout_secs = timeout;
    }
    if let Some(base) = parse_env(&get, "BACKOFF_BASE_SECS")? {
        config.fetch.backoff_base_secs = base;
    }
    if let Some(agent) = get("USER_AGENT") {
        config.fetch.user_agent = agent;
    }
    if let Some(cookies) = get("COOKIES") {
        config.fetch.cookies = Some(cookies);
    }

    Ok(())
}

fn parse_env<T, F>(get: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                name: name.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

/// Parses a `name=value; name=value` cookie string
///
/// Pairs without `=` or with an empty name are ignored. Later duplicates win.
pub fn parse_cookie_string(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Computes a SHA-256 hash of the effective configuration
///
/// This is stored on each run so changes between runs can be detected.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the serialized configuration
/// * `Err(ConfigError)` - Failed to serialize the configuration
pub fn compute_config_hash(config: &Config) -> Result<String, ConfigError> {
    let content = toml::to_string(config)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}
