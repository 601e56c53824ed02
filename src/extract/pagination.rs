//! Thread page count detection
//!
//! Themes expose pagination either as `showthread.php?tid=X&page=N` links or
//! as plain numbered links inside a `div.pagination` block. Both signals are
//! collected and the largest page number wins.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

use super::links::query_param;
use super::{has_class, is_inside, PageDocument};

static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));
static PAGINATION_BLOCKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.pagination").expect("valid selector"));
static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));

/// Returns the number of pages in thread `thread_id` (always at least 1)
pub fn extract_page_count(doc: &PageDocument, thread_id: i64) -> u32 {
    let mut pages = thread_link_pages(doc, thread_id);

    if pages.is_empty() {
        pages = pagination_block_pages(doc);
    }

    pages.insert(1);
    pages.into_iter().max().unwrap_or(1)
}

/// Page numbers from links pointing at this thread
fn thread_link_pages(doc: &PageDocument, thread_id: i64) -> BTreeSet<u32> {
    let tid = thread_id.to_string();
    let mut pages = BTreeSet::new();

    for link in doc.select(&LINKS) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if query_param(href, "tid").as_deref() != Some(tid.as_str()) {
            continue;
        }

        if let Some(page) = query_param(href, "page").and_then(|p| p.trim().parse().ok()) {
            pages.insert(page);
        }
        if let Some(page) = numeric_text(link) {
            pages.insert(page);
        }
    }

    pages
}

/// Page numbers from `div.pagination` blocks outside the breadcrumb
fn pagination_block_pages(doc: &PageDocument) -> BTreeSet<u32> {
    doc.select(&PAGINATION_BLOCKS)
        .filter(|block| !is_inside(*block, |el| has_class(el, "navigation")))
        .flat_map(|block| block.select(&ANCHORS))
        .filter_map(numeric_text)
        .collect()
}

/// Parses a link's visible text if it is purely numeric
fn numeric_text(link: ElementRef<'_>) -> Option<u32> {
    let text = link.text().collect::<String>();
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
