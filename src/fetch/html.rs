// src/fetch/html.rs
// =============================================================================
// This module pulls link targets out of HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// Unlike a strict parser, html5ever never gives up on a page. Broken markup
// is repaired the same way a browser would, so we always get back whatever
// anchors could be found.
//
// Resolving the hrefs into absolute URLs is NOT done here. The crawler does
// that itself because it needs to know which page the link was found on.
// =============================================================================

use scraper::{Html, Selector};
use std::sync::OnceLock;

// Matches every <a> element that carries an href attribute
fn anchor_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    // The selector is a constant and known to be valid
    SELECTOR.get_or_init(|| Selector::parse("a[href]").expect("a[href] is a valid selector"))
}

// Returns the raw href values of all anchors, in document order
//
// Example:
//   html = "<a href='/docs'>Docs</a><a href='mailto:me@x.io'>Mail</a>"
//   result = ["/docs", "mailto:me@x.io"]
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(anchor_selector())
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}
