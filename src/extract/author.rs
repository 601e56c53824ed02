//! Author statistics from the post sidebar
//!
//! MyBB renders a profile summary next to each post:
//! `Posts: 1,234 Threads: 4 Joined: Dec 2021`. Each field is matched on its
//! own so one odd value never hides the others.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use super::dates::parse_joined_date;
use super::post::extract_username;

static STATS_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.author_statistics").expect("valid selector"));

static POSTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Posts:\s*([\d,]+)").expect("valid regex"));
static THREADS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Threads:\s*([\d,]+)").expect("valid regex"));
static JOINED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Joined:\s*([A-Za-z]+\s+\d{4})").expect("valid regex"));

/// Profile snapshot taken from a post
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorStats {
    pub username: Option<String>,
    pub post_count: Option<i64>,
    pub thread_count: Option<i64>,
    pub joined_at: Option<NaiveDateTime>,
}

/// Extracts the author's name and profile statistics from a post container
pub fn extract_author_stats(post: ElementRef<'_>) -> AuthorStats {
    let username = extract_username(post);

    let Some(block) = post.select(&STATS_BLOCK).next() else {
        return AuthorStats {
            username,
            ..AuthorStats::default()
        };
    };

    let text = block.text().collect::<String>();
    let mut stats = parse_stats_text(&text);
    stats.username = username;
    stats
}

/// Parses the statistics text; the username is left unset
pub fn parse_stats_text(text: &str) -> AuthorStats {
    let joined_at = JOINED.captures(text).and_then(|caps| {
        let raw = &caps[1];
        let parsed = parse_joined_date(raw);
        if parsed.is_none() {
            tracing::debug!("Could not parse joined date '{}'", raw);
        }
        parsed
    });

    AuthorStats {
        username: None,
        post_count: capture_count(&POSTS, text),
        thread_count: capture_count(&THREADS, text),
        joined_at,
    }
}

fn capture_count(pattern: &Regex, text: &str) -> Option<i64> {
    let caps = pattern.captures(text)?;
    caps[1].replace(',', "").parse().ok()
}
