//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{PostRecord, RunRecord, RunStatus, ThreadRecord, UserRecord};
use crate::ScrapeError;
use chrono::{NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Column format for forum timestamps
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(ScrapeError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, ScrapeError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;
        tracing::debug!("Opened database at {}", path.display());

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> Result<Self, ScrapeError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Closes the underlying connection, flushing any pending work
    pub fn close(self) -> Result<(), ScrapeError> {
        self.conn.close().map_err(|(_, e)| e)?;
        tracing::info!("Database connection closed");
        Ok(())
    }
}

fn format_timestamp(ts: &Option<NaiveDateTime>) -> Option<String> {
    ts.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
}

fn read_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Interrupted),
        start_tid: row.get(5)?,
        end_tid: row.get(6)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        post_id: row.get(0)?,
        posted_at: read_timestamp(row, 1)?,
        body: row.get(2)?,
        author: row.get(3)?,
        thread_id: row.get(4)?,
        replies_to_post_id: row.get(5)?,
    })
}

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, start_tid, end_tid";
const POST_COLUMNS: &str =
    "post_id, post_date, post_text, username, thread_id, replies_to_post_id";

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(
        &mut self,
        config_hash: &str,
        start_tid: i64,
        end_tid: i64,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status, start_tid, end_tid)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                now,
                config_hash,
                RunStatus::Running.to_db_string(),
                start_tid,
                end_tid
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    // ===== Threads =====

    fn thread_exists(&self, thread_id: i64) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM threads WHERE thread_id = ?1",
                params![thread_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn upsert_thread(&mut self, thread: &ThreadRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO threads (thread_id, thread_title, board_name, date_posted)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(thread_id) DO UPDATE SET
                thread_title = excluded.thread_title,
                board_name = excluded.board_name,
                date_posted = excluded.date_posted",
            params![
                thread.thread_id,
                thread.title,
                thread.board_path,
                format_timestamp(&thread.created_at)
            ],
        )?;
        Ok(())
    }

    fn get_thread(&self, thread_id: i64) -> StorageResult<Option<ThreadRecord>> {
        let thread = self
            .conn
            .query_row(
                "SELECT thread_id, thread_title, board_name, date_posted
                 FROM threads WHERE thread_id = ?1",
                params![thread_id],
                |row| {
                    Ok(ThreadRecord {
                        thread_id: row.get(0)?,
                        title: row.get(1)?,
                        board_path: row.get(2)?,
                        created_at: read_timestamp(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(thread)
    }

    // ===== Users =====

    fn upsert_user(&mut self, user: &UserRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO users (username, num_posts, num_threads, joined_date)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(username) DO UPDATE SET
                num_posts = excluded.num_posts,
                num_threads = excluded.num_threads,
                joined_date = excluded.joined_date",
            params![
                user.username,
                user.post_count,
                user.thread_count,
                format_timestamp(&user.joined_at)
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, username: &str) -> StorageResult<Option<UserRecord>> {
        let user = self
            .conn
            .query_row(
                "SELECT username, num_posts, num_threads, joined_date
                 FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserRecord {
                        username: row.get(0)?,
                        post_count: row.get(1)?,
                        thread_count: row.get(2)?,
                        joined_at: read_timestamp(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    // ===== Posts =====

    fn upsert_post(&mut self, post: &PostRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO posts (post_id, post_date, post_text, username, thread_id, replies_to_post_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(post_id) DO UPDATE SET
                post_date = excluded.post_date,
                post_text = excluded.post_text,
                username = excluded.username,
                thread_id = excluded.thread_id,
                replies_to_post_id = excluded.replies_to_post_id",
            params![
                post.post_id,
                format_timestamp(&post.posted_at),
                post.body,
                post.author,
                post.thread_id,
                post.replies_to_post_id
            ],
        )?;
        Ok(())
    }

    fn get_post(&self, post_id: i64) -> StorageResult<Option<PostRecord>> {
        let post = self
            .conn
            .query_row(
                &format!("SELECT {} FROM posts WHERE post_id = ?1", POST_COLUMNS),
                params![post_id],
                post_from_row,
            )
            .optional()?;
        Ok(post)
    }

    fn get_posts_for_thread(&self, thread_id: i64) -> StorageResult<Vec<PostRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM posts WHERE thread_id = ?1 ORDER BY post_id",
            POST_COLUMNS
        ))?;

        let posts = stmt
            .query_map(params![thread_id], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    // ===== Statistics =====

    fn count_threads(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM threads", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_users(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_posts(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_replies(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE replies_to_post_id IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
