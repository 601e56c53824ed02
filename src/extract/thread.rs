//! Thread-level metadata extraction

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

use super::dates::parse_post_date;
use super::{collapse_whitespace, has_class, is_inside, PageDocument};

static NAVIGATION_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.navigation a").expect("valid selector"));
static FIRST_POST: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.post").expect("valid selector"));
static POST_DATE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.post_date").expect("valid selector"));
static ERROR_BLOCKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.error").expect("valid selector"));

/// Separator between breadcrumb segments
pub const BOARD_PATH_SEPARATOR: &str = " › ";

/// Phrases in a `div.error` block that mean the thread does not exist
const NOT_FOUND_MARKERS: &[&str] = &["not found", "does not exist"];

/// Metadata read from a thread's first page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadMetadata {
    /// Page `<title>`; a page without one is not a thread page
    pub title: Option<String>,

    /// Breadcrumb trail, segments joined by [`BOARD_PATH_SEPARATOR`]
    pub board_path: Option<String>,

    /// Date of the first post on the page
    pub posted_at: Option<NaiveDateTime>,
}

/// Extracts title, breadcrumb path and first-post date
pub fn extract_thread_metadata(doc: &PageDocument) -> ThreadMetadata {
    ThreadMetadata {
        title: doc.title(),
        board_path: extract_board_path(doc),
        posted_at: first_post_date(doc),
    }
}

/// Returns true if the page carries the forum's "thread not found" error
pub fn is_not_found_page(doc: &PageDocument) -> bool {
    doc.select(&ERROR_BLOCKS).any(|block| {
        let text = block.text().collect::<String>().to_lowercase();
        NOT_FOUND_MARKERS.iter().any(|marker| text.contains(marker))
    })
}

fn extract_board_path(doc: &PageDocument) -> Option<String> {
    let segments: Vec<String> = doc
        .select(&NAVIGATION_LINKS)
        .filter(|link| !is_pagination_link(*link))
        .map(|link| collapse_whitespace(&link.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join(BOARD_PATH_SEPARATOR))
    }
}

/// A link that is itself a pagination control or sits in a pagination block
fn is_pagination_link(link: ElementRef<'_>) -> bool {
    let classed = link
        .value()
        .classes()
        .any(|class| class.starts_with("pagination_"));

    classed || is_inside(link, |el| el.value().name() == "div" && has_class(el, "pagination"))
}

fn first_post_date(doc: &PageDocument) -> Option<NaiveDateTime> {
    let first_post = doc
        .post_elements()
        .into_iter()
        .next()
        .or_else(|| doc.first(&FIRST_POST))?;

    let date = first_post.select(&POST_DATE).next()?;
    parse_post_date(&collapse_whitespace(&date.text().collect::<String>()))
}
