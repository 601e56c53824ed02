//! Configuration module for Forum-Archiver
//!
//! Configuration is layered: built-in defaults, an optional TOML file,
//! environment variables, then command-line overrides applied by the binary.
//!
//! # Example
//!
//! ```no_run
//! use forum_archiver::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Some(Path::new("archiver.toml"))).unwrap();
//! println!("Archiving threads {}..={}", config.range.start_tid, config.range.end_tid);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DatabaseConfig, FetchConfig, ForumConfig, RangeConfig, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_file, parse_cookie_string,
};
pub use validation::validate;
