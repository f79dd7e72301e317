//! Bing result-page scraping.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;
use tracing::debug;

use super::{rank_hits, SearchLocale};
use crate::error::ProviderResult;
use crate::providers::html::{element_text, first_match, link_href, select_first_nonempty};
use crate::providers::http::PageFetcher;
use crate::traits::searcher::WebSearcher;
use crate::types::request::{SearchHit, SearchRequest};

const SEARCH_URL: &str = "https://www.bing.com/search";

const RESULT_SELECTORS: &[&str] = &["li.b_algo", ".b_algo", "li[class*=\"algo\"]", ".b_webResult"];
const TITLE_SELECTORS: &[&str] = &["h2 a", "h2", ".b_title a", "a[href]"];
const SNIPPET_SELECTORS: &[&str] = &[".b_caption p", "p", ".b_snippet", "[class*=\"caption\"]"];

pub struct BingSearch {
    id: String,
    fetcher: Arc<PageFetcher>,
    locale: SearchLocale,
    search_url: String,
}

impl BingSearch {
    pub fn new(fetcher: Arc<PageFetcher>, locale: SearchLocale) -> Self {
        Self {
            id: "bing".to_string(),
            fetcher,
            locale,
            search_url: SEARCH_URL.to_string(),
        }
    }

    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }
}

/// Parse a Bing result page.
pub fn parse_results(html: &str, source: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let raw = select_first_nonempty(&document, RESULT_SELECTORS)
        .into_iter()
        .filter_map(|item| {
            let title_elem = first_match(item, TITLE_SELECTORS)?;
            let title = element_text(title_elem);
            let url = link_href(title_elem)?;
            let snippet = first_match(item, SNIPPET_SELECTORS)
                .map(element_text)
                .unwrap_or_default();
            Some((title, url, snippet))
        })
        .collect::<Vec<_>>();

    rank_hits(raw, source, max_results)
}

#[async_trait]
impl WebSearcher for BingSearch {
    fn id(&self) -> &str {
        &self.id
    }

    /// Scraped without credentials; a startup query would only burn the pacing budget.
    async fn validate(&self) -> ProviderResult<()> {
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> ProviderResult<Vec<SearchHit>> {
        let count = request.max_results.to_string();
        let setlang = format!("{}-{}", self.locale.language, self.locale.country);

        let html = self
            .fetcher
            .fetch_with_query(
                &self.search_url,
                &[
                    ("q", request.query.as_str()),
                    ("cc", self.locale.country.as_str()),
                    ("setlang", setlang.as_str()),
                    ("count", count.as_str()),
                    ("first", "1"),
                    ("FORM", "PERE"),
                ],
            )
            .await?;

        let hits = parse_results(&html, &self.id, request.max_results);
        debug!(provider = %self.id, hits = hits.len(), "Bing results parsed");
        Ok(hits)
    }
}
