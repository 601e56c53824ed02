//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the archive database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    start_tid INTEGER NOT NULL,
    end_tid INTEGER NOT NULL
);

-- Forum members, latest statistics snapshot
CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    num_posts INTEGER,
    num_threads INTEGER,
    joined_date TEXT
);

-- Threads; presence of a row marks the thread as scraped
CREATE TABLE IF NOT EXISTS threads (
    thread_id INTEGER PRIMARY KEY,
    thread_title TEXT NOT NULL,
    board_name TEXT,
    date_posted TEXT
);

-- Posts; replies_to_post_id may name a post that was never archived
CREATE TABLE IF NOT EXISTS posts (
    post_id INTEGER PRIMARY KEY,
    post_date TEXT,
    post_text TEXT,
    username TEXT NOT NULL REFERENCES users(username),
    thread_id INTEGER NOT NULL REFERENCES threads(thread_id),
    replies_to_post_id INTEGER
);

CREATE INDEX IF NOT EXISTS idx_posts_thread ON posts(thread_id);
CREATE INDEX IF NOT EXISTS idx_posts_username ON posts(username);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
