//! Single-thread crawl
//!
//! Drives one thread from its first page through every later page:
//!
//! 1. Fetch page 1. A fetch failure, the forum's "not found" block or a
//!    missing `<title>` ends the thread before anything is stored.
//! 2. Persist the thread record and read the page bound.
//! 3. Persist users and posts page by page. Page 1 without a usable post
//!    aborts the thread; a later page that fails stops the walk but keeps
//!    what was already stored.
//!
//! The thread record is written before any post so the foreign keys hold,
//! and a titled thread counts as archived from then on.

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::extract::{
    extract_author_stats, extract_page_count, extract_post, extract_thread_metadata,
    is_not_found_page, PageDocument,
};
use crate::state::{AbortReason, ThreadState};
use crate::storage::{PostRecord, Storage, ThreadRecord, UserRecord};
use std::time::Duration;

/// Outcome of crawling one thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadReport {
    pub thread_id: i64,
    pub final_state: ThreadState,
    /// Why the thread was aborted, or why the page walk stopped early
    pub reason: Option<AbortReason>,
    /// Page bound read from page 1
    pub page_count: u32,
    pub pages_processed: u32,
    pub posts_saved: usize,
}

impl ThreadReport {
    fn new(thread_id: i64) -> Self {
        Self {
            thread_id,
            final_state: ThreadState::Start,
            reason: None,
            page_count: 0,
            pages_processed: 0,
            posts_saved: 0,
        }
    }

    /// A thread succeeds once at least one of its posts is stored
    pub fn is_success(&self) -> bool {
        self.posts_saved > 0
    }
}

/// Post tallies for one page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PageTally {
    usable: usize,
    saved: usize,
}

/// Crawls individual threads into a store
pub struct ThreadCrawler<'a, S: Storage> {
    config: &'a Config,
    fetcher: &'a Fetcher,
    storage: &'a mut S,
}

impl<'a, S: Storage> ThreadCrawler<'a, S> {
    pub fn new(config: &'a Config, fetcher: &'a Fetcher, storage: &'a mut S) -> Self {
        Self {
            config,
            fetcher,
            storage,
        }
    }

    /// Crawls every page of `thread_id`
    ///
    /// Never fails: fetch and persistence problems are logged and reflected
    /// in the returned report.
    pub async fn crawl(&mut self, thread_id: i64) -> ThreadReport {
        let mut report = ThreadReport::new(thread_id);
        advance(&mut report, ThreadState::FetchPage1);

        let Some(first_page) = self.fetch_page(thread_id, 1).await else {
            return abort(report, AbortReason::Unreachable);
        };

        if is_not_found_page(&first_page) {
            return abort(report, AbortReason::NotFound);
        }

        let metadata = extract_thread_metadata(&first_page);
        let Some(title) = metadata.title else {
            return abort(report, AbortReason::NoTitle);
        };

        tracing::info!("Thread {}: {}", thread_id, title);
        let record = ThreadRecord {
            thread_id,
            title,
            board_path: metadata.board_path,
            created_at: metadata.posted_at,
        };
        if let Err(e) = self.storage.upsert_thread(&record) {
            tracing::warn!("Failed to store thread {}: {}", thread_id, e);
        }

        report.page_count = extract_page_count(&first_page, thread_id);
        advance(&mut report, ThreadState::MetadataOk);
        tracing::debug!("Thread {} has {} page(s)", thread_id, report.page_count);

        let tally = self.process_page(&first_page, thread_id);
        drop(first_page);
        report.pages_processed = 1;
        report.posts_saved += tally.saved;

        if tally.usable == 0 {
            return abort(report, AbortReason::NoValidPosts);
        }

        for page in 2..=report.page_count {
            advance(&mut report, ThreadState::FetchNextPage);

            let tally = match self.fetch_page(thread_id, page).await {
                Some(doc) => self.process_page(&doc, thread_id),
                None => PageTally::default(),
            };

            if tally.usable == 0 {
                tracing::warn!(
                    "Thread {}: stopping at page {}/{}",
                    thread_id,
                    page,
                    report.page_count
                );
                report.reason = Some(AbortReason::PageFailure);
                break;
            }

            report.pages_processed += 1;
            report.posts_saved += tally.saved;
        }

        advance(&mut report, ThreadState::Done);
        report
    }

    /// Fetches one page of a thread, then pauses for the request delay
    async fn fetch_page(&self, thread_id: i64, page: u32) -> Option<PageDocument> {
        let url = self.config.thread_page_url(thread_id, page);
        let result = self.fetcher.fetch_document(&url).await;
        pause(self.config.fetch.request_delay()).await;

        match result {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!("Thread {} page {}: {}", thread_id, page, e);
                None
            }
        }
    }

    /// Stores every usable post on a page along with its author
    fn process_page(&mut self, doc: &PageDocument, thread_id: i64) -> PageTally {
        let mut tally = PageTally::default();

        for element in doc.post_elements() {
            let post = extract_post(element, thread_id);
            let (Some(post_id), Some(author)) = (post.post_id, post.author) else {
                tracing::debug!("Thread {}: skipping post without id or author", thread_id);
                continue;
            };
            tally.usable += 1;

            let stats = extract_author_stats(element);
            let username = match stats.username {
                Some(name) if name != author => {
                    tracing::debug!(
                        "Post {}: author '{}' differs from profile '{}'",
                        post_id,
                        author,
                        name
                    );
                    name
                }
                _ => author,
            };

            let user = UserRecord {
                username: username.clone(),
                post_count: stats.post_count,
                thread_count: stats.thread_count,
                joined_at: stats.joined_at,
            };
            if let Err(e) = self.storage.upsert_user(&user) {
                tracing::warn!("Failed to store user '{}': {}", username, e);
            }

            let record = PostRecord {
                post_id,
                posted_at: post.posted_at,
                body: post.body,
                author: username,
                thread_id,
                replies_to_post_id: post.replies_to_post_id,
            };
            match self.storage.upsert_post(&record) {
                Ok(()) => tally.saved += 1,
                Err(e) => tracing::warn!("Failed to store post {}: {}", post_id, e),
            }
        }

        tally
    }
}

fn advance(report: &mut ThreadReport, next: ThreadState) {
    debug_assert!(
        report.final_state.can_transition_to(next),
        "illegal transition {} -> {}",
        report.final_state,
        next
    );
    tracing::trace!(
        "Thread {}: {} -> {}",
        report.thread_id,
        report.final_state,
        next
    );
    report.final_state = next;
}

fn abort(mut report: ThreadReport, reason: AbortReason) -> ThreadReport {
    advance(&mut report, ThreadState::Aborted);
    report.reason = Some(reason);
    report
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
