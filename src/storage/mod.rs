//! Storage module for persisting archived forum data
//!
//! This module handles all database operations for the archiver, including:
//! - SQLite database initialization and schema management
//! - Keyed upserts for threads, users and posts
//! - The existence check used to skip finished threads
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::ScrapeError;
use chrono::NaiveDateTime;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(ScrapeError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, ScrapeError> {
    SqliteStorage::new(path)
}

/// A forum thread, keyed by `thread_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRecord {
    pub thread_id: i64,
    pub title: String,
    pub board_path: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

/// A forum member's profile snapshot, keyed by `username`
///
/// Statistics are overwritten on every scrape; the latest snapshot wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub post_count: Option<i64>,
    pub thread_count: Option<i64>,
    pub joined_at: Option<NaiveDateTime>,
}

/// A single post, keyed by `post_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub post_id: i64,
    pub posted_at: Option<NaiveDateTime>,
    pub body: Option<String>,
    pub author: String,
    pub thread_id: i64,
    /// Quoted post id; not a foreign key, the target may never be archived
    pub replies_to_post_id: Option<i64>,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub start_tid: i64,
    pub end_tid: i64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}
