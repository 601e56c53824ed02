//! Range runner
//!
//! Walks the configured thread id range in ascending order, skipping threads
//! the store already holds, and records the pass in the run ledger.

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::thread::ThreadCrawler;
use crate::storage::{RunStatus, Storage};
use crate::ScrapeError;
use tokio_util::sync::CancellationToken;

/// Totals for one pass over the range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Threads that were fetched
    pub crawled: u64,
    /// Crawled threads with at least one stored post
    pub succeeded: u64,
    /// Crawled threads without a stored post
    pub failed: u64,
    /// Threads already in the store
    pub skipped: u64,
    /// True if the pass stopped before the end of the range
    pub cancelled: bool,
}

/// Owns the fetcher and the store for the length of a pass
pub struct RangeRunner<S: Storage> {
    config: Config,
    fetcher: Fetcher,
    storage: S,
}

impl<S: Storage> RangeRunner<S> {
    pub fn new(config: Config, fetcher: Fetcher, storage: S) -> Self {
        Self {
            config,
            fetcher,
            storage,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Releases the fetcher and hands back the store
    pub fn close(self) -> S {
        tracing::debug!("Closing range runner");
        self.storage
    }

    /// Crawls every thread id in the configured range
    ///
    /// Cancellation is checked before each thread and cuts the pause between
    /// threads short; a thread already in progress is finished first.
    /// Only run ledger failures are returned as errors.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
        config_hash: &str,
    ) -> Result<RunSummary, ScrapeError> {
        let start = self.config.range.start_tid;
        let end = self.config.range.end_tid;

        let run_id = self.storage.create_run(config_hash, start, end)?;
        tracing::info!("Run {}: archiving threads {}..={}", run_id, start, end);

        let summary = self.crawl_range(cancel).await;

        let status = if summary.cancelled {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        self.storage.finish_run(run_id, status)?;

        tracing::info!(
            "Run {} {}: {} crawled ({} succeeded, {} failed), {} skipped",
            run_id,
            status.to_db_string(),
            summary.crawled,
            summary.succeeded,
            summary.failed,
            summary.skipped
        );

        Ok(summary)
    }

    async fn crawl_range(&mut self, cancel: &CancellationToken) -> RunSummary {
        let mut summary = RunSummary::default();
        let delay = self.config.fetch.request_delay();

        for thread_id in self.config.range.start_tid..=self.config.range.end_tid {
            if cancel.is_cancelled() {
                tracing::info!("Cancelled before thread {}", thread_id);
                summary.cancelled = true;
                break;
            }

            match self.storage.thread_exists(thread_id) {
                Ok(true) => {
                    tracing::debug!("Thread {} already archived, skipping", thread_id);
                    summary.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        "Could not check thread {}, crawling anyway: {}",
                        thread_id,
                        e
                    );
                }
            }

            let report = ThreadCrawler::new(&self.config, &self.fetcher, &mut self.storage)
                .crawl(thread_id)
                .await;
            debug_assert!(report.final_state.is_terminal());

            summary.crawled += 1;
            if report.is_success() {
                summary.succeeded += 1;
                tracing::info!(
                    "Thread {} archived: {} post(s) over {} page(s)",
                    thread_id,
                    report.posts_saved,
                    report.pages_processed
                );
            } else {
                summary.failed += 1;
                match report.reason {
                    Some(reason) => tracing::warn!("Thread {} failed: {}", thread_id, reason),
                    None => tracing::warn!("Thread {} failed: no posts stored", thread_id),
                }
            }

            if !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        summary
    }
}
