//! Text extraction from post bodies
//!
//! Quoted replies are `blockquote` elements nested in the body. They are
//! skipped while walking so quoted text never lands in the quoting post.

use scraper::{ElementRef, Node};

const QUOTE_TAG: &str = "blockquote";

/// Extracts a post body's own text, one line per text fragment
///
/// Each line is trimmed and blank lines are dropped. Returns `None` when the
/// body holds nothing but whitespace outside of quotes.
pub fn body_text(container: ElementRef<'_>) -> Option<String> {
    let mut fragments = Vec::new();
    collect_unquoted_text(container, &mut fragments);

    let joined = fragments.join("\n");
    let collapsed = joined
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Pushes every text node under `element`, skipping quote subtrees
fn collect_unquoted_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push(String::from(&**text)),
            Node::Element(el) if el.name() == QUOTE_TAG => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_unquoted_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// Returns the direct-child quote blocks of `container`, in order
pub fn top_level_quotes(container: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    container
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == QUOTE_TAG)
}
