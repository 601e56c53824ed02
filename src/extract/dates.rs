//! Forum date parsing
//!
//! Post dates render as `09-Dec-2021, 10:06 PM`, optionally followed by an
//! edit annotation in parentheses. Join dates render as `Dec 2021`.

use chrono::{NaiveDate, NaiveDateTime};

/// Accepted post date formats, tried in order
const POST_DATE_FORMATS: &[&str] = &["%d-%b-%Y, %I:%M %p", "%d-%b-%Y, %H:%M"];

/// Parses a post date, ignoring anything from the first `(` onward
pub fn parse_post_date(raw: &str) -> Option<NaiveDateTime> {
    let text = raw.split('(').next().unwrap_or(raw).trim();
    if text.is_empty() {
        return None;
    }

    POST_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

/// Parses a `Mon YYYY` join date into the first day of that month
pub fn parse_joined_date(raw: &str) -> Option<NaiveDateTime> {
    let mut parts = raw.split_whitespace();
    let month = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    NaiveDate::parse_from_str(&format!("01 {} {}", month, year), "%d %b %Y")
        .ok()?
        .and_hms_opt(0, 0, 0)
}
