//! Search engine adapters.
//!
//! - [`GoogleCustomSearch`] and [`SerperSearch`] call JSON APIs
//! - [`BingSearch`] and [`DuckDuckGoSearch`] scrape result pages and should be
//!   wrapped in [`Paced`](crate::providers::paced::Paced)

pub mod bing;
pub mod duckduckgo;
pub mod google;
pub mod serper;

pub use bing::BingSearch;
pub use duckduckgo::DuckDuckGoSearch;
pub use google::GoogleCustomSearch;
pub use serper::SerperSearch;

use crate::types::request::SearchHit;

/// Country and language used to localize results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLocale {
    /// ISO country code, e.g. `br`
    pub country: String,
    /// ISO language code, e.g. `pt`
    pub language: String,
}

impl Default for SearchLocale {
    fn default() -> Self {
        Self {
            country: "br".to_string(),
            language: "pt".to_string(),
        }
    }
}

impl SearchLocale {
    pub fn new(country: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            country: country.into().to_lowercase(),
            language: language.into().to_lowercase(),
        }
    }
}

/// Keep valid hits, assign 1-based ranks, stop at `max_results`.
pub(crate) fn rank_hits(
    raw: impl IntoIterator<Item = (String, String, String)>,
    source: &str,
    max_results: usize,
) -> Vec<SearchHit> {
    raw.into_iter()
        .map(|(title, url, snippet)| SearchHit::new(title.trim(), url.trim(), snippet.trim(), source, 0))
        .filter(SearchHit::is_valid)
        .take(max_results)
        .enumerate()
        .map(|(index, mut hit)| {
            hit.rank = index + 1;
            hit
        })
        .collect()
}
