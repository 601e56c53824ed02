//! Statistics generation from the archive database
//!
//! This module provides functionality for extracting and displaying
//! archive statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::ScrapeError;

/// Archive statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub threads: u64,
    pub users: u64,
    pub posts: u64,

    /// Posts that quote another post
    pub replies: u64,

    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(ScrapeError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, ScrapeError> {
    Ok(CrawlStatistics {
        threads: storage.count_threads()?,
        users: storage.count_users()?,
        posts: storage.count_posts()?,
        replies: storage.count_replies()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Renders statistics as a plain-text report
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::from("=== Archive Statistics ===\n\n");

    out.push_str(&format!("  Threads: {}\n", stats.threads));
    out.push_str(&format!("  Users: {}\n", stats.users));
    out.push_str(&format!("  Posts: {}\n", stats.posts));

    let reply_share = if stats.posts > 0 {
        (stats.replies as f64 / stats.posts as f64) * 100.0
    } else {
        0.0
    };
    out.push_str(&format!(
        "  Replies: {} ({:.1}% of posts)\n",
        stats.replies, reply_share
    ));

    out.push('\n');
    match &stats.latest_run {
        Some(run) => {
            out.push_str(&format!("Latest Run (#{}):\n", run.id));
            out.push_str(&format!("  Range: {}..={}\n", run.start_tid, run.end_tid));
            out.push_str(&format!("  Status: {}\n", run.status.to_db_string()));
            out.push_str(&format!("  Started: {}\n", run.started_at));
            if let Some(finished) = &run.finished_at {
                out.push_str(&format!("  Finished: {}\n", finished));
            }
        }
        None => out.push_str("No runs recorded\n"),
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}
