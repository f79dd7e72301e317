//! Last-resort strategy: every visible text node on the page.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;
use tracing::debug;

use super::clean::{clean_text, visible_text, NON_CONTENT_TAGS};
use crate::error::ProviderResult;
use crate::providers::http::PageFetcher;
use crate::traits::extractor::{accept_content, ContentExtractor};
use crate::types::request::ExtractedContent;

pub struct RawHtmlExtractor {
    id: String,
    fetcher: Arc<PageFetcher>,
}

impl RawHtmlExtractor {
    pub fn new(fetcher: Arc<PageFetcher>) -> Self {
        Self {
            id: "raw_html".to_string(),
            fetcher,
        }
    }
}

/// All text outside scripts and styles, cleaned.
pub fn extract_raw(html: &str) -> String {
    let document = Html::parse_document(html);
    clean_text(&visible_text(document.root_element(), NON_CONTENT_TAGS))
}

#[async_trait]
impl ContentExtractor for RawHtmlExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    async fn extract(&self, url: &str) -> ProviderResult<ExtractedContent> {
        let html = self.fetcher.fetch(url).await?;
        let text = extract_raw(&html);
        debug!(provider = %self.id, url = %url, chars = text.len(), "Raw page text extracted");
        accept_content(url, text, &self.id)
    }
}
