//! HTML-to-record extraction
//!
//! Pure functions from a parsed forum page to typed records:
//! - Thread pagination bound
//! - Thread metadata (title, breadcrumb path, first post date)
//! - Per-post fields (id, author, date, body, reply target)
//! - Per-author statistics
//!
//! Nothing here performs I/O or returns an error. Missing or malformed markup
//! leaves the corresponding field `None`; the crawler decides what absence
//! means for a page or thread.

mod author;
mod dates;
mod document;
mod links;
mod pagination;
mod post;
mod text;
mod thread;

pub use author::{extract_author_stats, parse_stats_text, AuthorStats};
pub use dates::{parse_joined_date, parse_post_date};
pub use document::{PageDocument, POST_ID_PATTERN};
pub use links::{numeric_query_param, query_param};
pub use pagination::extract_page_count;
pub use post::{extract_post, extract_username, ExtractedPost};
pub use thread::{extract_thread_metadata, is_not_found_page, ThreadMetadata, BOARD_PATH_SEPARATOR};

use scraper::ElementRef;

/// Trims and collapses every whitespace run to a single space
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns true if `element` carries `class`
pub(crate) fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Returns true if any ancestor element of `element` satisfies `predicate`
pub(crate) fn is_inside<F>(element: ElementRef<'_>, predicate: F) -> bool
where
    F: Fn(ElementRef<'_>) -> bool,
{
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(predicate)
}
