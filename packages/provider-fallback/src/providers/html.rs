//! Selector helpers shared by the scraping adapters.
//!
//! Scraped markup drifts, so lookups take a list of selectors and use the
//! first that matches.

use scraper::{ElementRef, Html, Selector};

/// Parse each selector, skipping any that are malformed.
pub fn selectors(patterns: &[&str]) -> Vec<Selector> {
    patterns
        .iter()
        .filter_map(|p| Selector::parse(p).ok())
        .collect()
}

/// Elements matched by the first selector that matches anything.
pub fn select_first_nonempty<'a>(document: &'a Html, patterns: &[&str]) -> Vec<ElementRef<'a>> {
    for selector in selectors(patterns) {
        let found: Vec<ElementRef<'a>> = document.select(&selector).collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// First descendant of `element` matching any selector, tried in order.
pub fn first_match<'a>(element: ElementRef<'a>, patterns: &[&str]) -> Option<ElementRef<'a>> {
    selectors(patterns)
        .iter()
        .find_map(|selector| element.select(selector).next())
}

/// Text content with whitespace runs collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `href` of the element itself or of its first descendant link.
pub fn link_href(element: ElementRef<'_>) -> Option<String> {
    if let Some(href) = element.value().attr("href") {
        return Some(href.to_string());
    }
    first_match(element, &["a[href]"])
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}
