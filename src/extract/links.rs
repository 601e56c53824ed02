//! Query-string helpers for forum links
//!
//! Forum hrefs are usually relative (`showthread.php?tid=5&page=2`), so they
//! are never resolved against a base; only their query string is inspected.

use url::form_urlencoded;

/// Returns the value of query parameter `name` in `href`, if present
pub fn query_param(href: &str, name: &str) -> Option<String> {
    let without_fragment = href.split('#').next().unwrap_or(href);
    let (_, query) = without_fragment.split_once('?')?;

    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Returns query parameter `name` parsed as an integer
pub fn numeric_query_param(href: &str, name: &str) -> Option<i64> {
    query_param(href, name)?.trim().parse().ok()
}
