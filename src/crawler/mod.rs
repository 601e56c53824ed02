//! Crawler module for fetching and archiving forum threads
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - The per-thread page walk
//! - The range runner that drives a whole pass

mod fetcher;
mod retry;
mod runner;
mod thread;

pub use fetcher::{build_http_client, FetchError, Fetcher};
pub use retry::RetryPolicy;
pub use runner::{RangeRunner, RunSummary};
pub use thread::{ThreadCrawler, ThreadReport};
