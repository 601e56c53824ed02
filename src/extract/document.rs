//! Parsed page wrapper
//!
//! `PageDocument` is the only type the extractors see. It owns the parsed
//! `scraper::Html` tree and exposes the handful of structural queries the
//! extraction rules need.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::collapse_whitespace;

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static DIV_WITH_ID: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[id]").expect("valid selector"));

/// Element ids that mark a single post container (`post_1234`)
pub static POST_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"post_\d+").expect("valid regex"));

/// One fetched HTML page
pub struct PageDocument {
    html: Html,
}

impl PageDocument {
    /// Parses a full HTML document
    ///
    /// html5ever recovers from any malformed input, so parsing never fails.
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// Returns the trimmed `<title>` text, or `None` if missing or blank
    pub fn title(&self) -> Option<String> {
        self.first(&TITLE)
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .filter(|title| !title.is_empty())
    }

    /// Returns every element matching `selector`, in document order
    pub fn select<'a>(
        &'a self,
        selector: &'a Selector,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.html.select(selector)
    }

    /// Returns the first element matching `selector`
    pub fn first<'a>(&'a self, selector: &'a Selector) -> Option<ElementRef<'a>> {
        self.html.select(selector).next()
    }

    /// Returns every `div` whose `id` attribute matches `pattern`
    pub fn divs_with_id_matching<'a>(&'a self, pattern: &'a Regex) -> Vec<ElementRef<'a>> {
        self.html
            .select(&DIV_WITH_ID)
            .filter(|element| {
                element
                    .value()
                    .id()
                    .map(|id| pattern.is_match(id))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Returns every post container on the page
    pub fn post_elements(&self) -> Vec<ElementRef<'_>> {
        self.divs_with_id_matching(&POST_ID_PATTERN)
    }
}
