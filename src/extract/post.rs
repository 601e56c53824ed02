//! Per-post extraction

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use super::collapse_whitespace;
use super::dates::parse_post_date;
use super::links::numeric_query_param;
use super::text::{body_text, top_level_quotes};

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

static AUTHOR_SPAN: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.largetext").expect("valid selector"));
static AUTHOR_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));
static POST_DATE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.post_date").expect("valid selector"));
static POST_BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.post_body").expect("valid selector"));
static CITATION_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("cite a[href]").expect("valid selector"));

/// Fields read from one post container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPost {
    pub thread_id: i64,
    pub post_id: Option<i64>,
    pub posted_at: Option<NaiveDateTime>,
    pub body: Option<String>,
    pub author: Option<String>,
    /// Post quoted by the first top-level quote block
    pub replies_to_post_id: Option<i64>,
}

impl ExtractedPost {
    /// A post is usable once both its id and author are known
    pub fn is_usable(&self) -> bool {
        self.post_id.is_some() && self.author.is_some()
    }
}

/// Extracts a single post from its `div#post_N` container
pub fn extract_post(post: ElementRef<'_>, thread_id: i64) -> ExtractedPost {
    let body = post.select(&POST_BODY).next();

    ExtractedPost {
        thread_id,
        post_id: post_id(post),
        posted_at: post_date(post),
        body: body.and_then(body_text),
        author: extract_username(post),
        replies_to_post_id: body.and_then(reply_target),
    }
}

/// Reads the poster's name from `span.largetext`
///
/// Registered users are wrapped in a profile link; guests are bare text.
pub fn extract_username(post: ElementRef<'_>) -> Option<String> {
    let span = post.select(&AUTHOR_SPAN).next()?;
    let source = span.select(&AUTHOR_LINK).next().unwrap_or(span);

    let name = collapse_whitespace(&source.text().collect::<String>());
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn post_id(post: ElementRef<'_>) -> Option<i64> {
    let id = post.value().id()?;
    DIGITS.find(id)?.as_str().parse().ok()
}

fn post_date(post: ElementRef<'_>) -> Option<NaiveDateTime> {
    let date = post.select(&POST_DATE).next()?;
    parse_post_date(&collapse_whitespace(&date.text().collect::<String>()))
}

fn reply_target(body: ElementRef<'_>) -> Option<i64> {
    let quote = top_level_quotes(body).next()?;
    let link = quote.select(&CITATION_LINK).next()?;
    numeric_query_param(link.value().attr("href")?, "pid")
}
