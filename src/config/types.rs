use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Browser-like user agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for Forum-Archiver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub forum: ForumConfig,
    pub database: DatabaseConfig,
    pub range: RangeConfig,
    pub fetch: FetchConfig,
}

impl Config {
    /// Builds the URL of one page of a thread
    ///
    /// Trailing slashes on the base URL are ignored.
    pub fn thread_page_url(&self, thread_id: i64, page: u32) -> String {
        format!(
            "{}/showthread.php?tid={}&page={}",
            self.forum.base_url.trim_end_matches('/'),
            thread_id,
            page
        )
    }
}

/// Target forum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ForumConfig {
    /// Base URL that `showthread.php` lives under
    pub base_url: String,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/forum".to_string(),
        }
    }
}

/// Archive database location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./forum_archive.db"),
        }
    }
}

/// Inclusive thread id range to walk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RangeConfig {
    pub start_tid: i64,
    pub end_tid: i64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            start_tid: 1,
            end_tid: 1000,
        }
    }
}

/// HTTP behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Pause after every page fetch and every crawled thread (seconds)
    pub request_delay_secs: f64,

    /// Total attempts per request, including the first
    pub max_retries: u32,

    /// Per-attempt timeout (seconds)
    pub timeout_secs: u64,

    /// Backoff before retry `n` is `backoff_base_secs * 2^n`
    pub backoff_base_secs: f64,

    pub user_agent: String,

    /// Raw `name=value; name=value` cookie string
    pub cookies: Option<String>,

    /// Extra headers sent with every request
    pub headers: BTreeMap<String, String>,
}

impl FetchConfig {
    /// Out-of-range values saturate; negative and NaN map to zero
    pub fn request_delay(&self) -> Duration {
        secs_to_duration(self.request_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        secs_to_duration(self.backoff_base_secs)
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

impl Default for FetchConfig {
    fn default() -> Self {
        let headers = [
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
            ("Accept-Language", "en-US,en;q=0.9"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            request_delay_secs: 1.0,
            max_retries: 3,
            timeout_secs: 30,
            backoff_base_secs: 1.0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookies: None,
            headers,
        }
    }
}
