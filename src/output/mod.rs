//! Output module for reporting on the archive
//!
//! This module handles the `--stats` report: record counts and the latest
//! run ledger entry.

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, CrawlStatistics};
