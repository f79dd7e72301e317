//! DuckDuckGo HTML endpoint scraping.
//!
//! Result links point at DuckDuckGo's redirector (`/l/?uddg=<target>`); the
//! real target is recovered from the `uddg` parameter.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;
use tracing::debug;
use url::Url;

use super::{rank_hits, SearchLocale};
use crate::error::ProviderResult;
use crate::providers::html::{element_text, first_match, link_href, select_first_nonempty};
use crate::providers::http::PageFetcher;
use crate::traits::searcher::WebSearcher;
use crate::types::request::{SearchHit, SearchRequest};

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

const RESULT_SELECTORS: &[&str] = &[".result", "div[class*=\"result\"]", ".web-result", ".results_links"];
const TITLE_SELECTORS: &[&str] = &[".result__a", "a.result__title", "h2 a", "a[href*=\"uddg\"]"];
const SNIPPET_SELECTORS: &[&str] = &[".result__snippet", ".snippet", "p"];

pub struct DuckDuckGoSearch {
    id: String,
    fetcher: Arc<PageFetcher>,
    locale: SearchLocale,
    search_url: String,
}

impl DuckDuckGoSearch {
    pub fn new(fetcher: Arc<PageFetcher>, locale: SearchLocale) -> Self {
        Self {
            id: "duckduckgo".to_string(),
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

/// Resolve a redirector link to its target. Other links pass through.
pub fn decode_redirect(href: &str) -> String {
    if !href.contains("uddg=") {
        return href.to_string();
    }
    Url::parse("https://duckduckgo.com")
        .and_then(|base| base.join(href))
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_else(|| href.to_string())
}

/// Parse a DuckDuckGo HTML result page.
pub fn parse_results(html: &str, source: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let raw = select_first_nonempty(&document, RESULT_SELECTORS)
        .into_iter()
        .filter_map(|item| {
            let title_elem = first_match(item, TITLE_SELECTORS)?;
            let title = element_text(title_elem);
            let url = decode_redirect(&link_href(title_elem)?);
            let snippet = first_match(item, SNIPPET_SELECTORS)
                .map(element_text)
                .unwrap_or_default();
            Some((title, url, snippet))
        })
        .collect::<Vec<_>>();

    rank_hits(raw, source, max_results)
}

#[async_trait]
impl WebSearcher for DuckDuckGoSearch {
    fn id(&self) -> &str {
        &self.id
    }

    /// Scraped without credentials; a startup query would only burn the pacing budget.
    async fn validate(&self) -> ProviderResult<()> {
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> ProviderResult<Vec<SearchHit>> {
        let region = format!("{}-{}", self.locale.country, self.locale.language);
        let html = self
            .fetcher
            .fetch_with_query(
                &self.search_url,
                &[("q", request.query.as_str()), ("kl", region.as_str())],
            )
            .await?;

        let hits = parse_results(&html, &self.id, request.max_results);
        debug!(provider = %self.id, hits = hits.len(), "DuckDuckGo results parsed");
        Ok(hits)
    }
}
