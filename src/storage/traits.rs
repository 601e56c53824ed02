//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{PostRecord, RunRecord, RunStatus, ThreadRecord, UserRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every upsert is keyed on the record's unique key and overwrites all other
/// columns on conflict. Callers decide what to do with a failed upsert; the
/// crawler logs it and carries on without that record.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run covering `start_tid..=end_tid`
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, start_tid: i64, end_tid: i64)
        -> StorageResult<i64>;

    /// Marks a run as finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Threads =====

    /// Returns true if a thread row exists; this is the "already scraped" marker
    fn thread_exists(&self, thread_id: i64) -> StorageResult<bool>;

    /// Inserts or overwrites a thread
    fn upsert_thread(&mut self, thread: &ThreadRecord) -> StorageResult<()>;

    /// Gets a thread by ID
    fn get_thread(&self, thread_id: i64) -> StorageResult<Option<ThreadRecord>>;

    // ===== Users =====

    /// Inserts or overwrites a user's statistics snapshot
    fn upsert_user(&mut self, user: &UserRecord) -> StorageResult<()>;

    /// Gets a user by name
    fn get_user(&self, username: &str) -> StorageResult<Option<UserRecord>>;

    // ===== Posts =====

    /// Inserts or overwrites a post
    ///
    /// The author and thread must already be stored.
    fn upsert_post(&mut self, post: &PostRecord) -> StorageResult<()>;

    /// Gets a post by ID
    fn get_post(&self, post_id: i64) -> StorageResult<Option<PostRecord>>;

    /// Gets every post of a thread, ordered by post ID
    fn get_posts_for_thread(&self, thread_id: i64) -> StorageResult<Vec<PostRecord>>;

    // ===== Statistics =====

    /// Gets total thread count
    fn count_threads(&self) -> StorageResult<u64>;

    /// Gets total user count
    fn count_users(&self) -> StorageResult<u64>;

    /// Gets total post count
    fn count_posts(&self) -> StorageResult<u64>;

    /// Gets count of posts that quote another post
    fn count_replies(&self) -> StorageResult<u64>;
}
