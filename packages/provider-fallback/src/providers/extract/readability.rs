//! Readability-style extraction: score content containers, keep the best.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;
use tracing::debug;

use super::clean::{clean_text, visible_text, BOILERPLATE_TAGS};
use crate::error::{ProviderError, ProviderResult};
use crate::providers::html::selectors;
use crate::providers::http::PageFetcher;
use crate::traits::extractor::{accept_content, ContentExtractor, MIN_CONTENT_CHARS};
use crate::types::request::ExtractedContent;

const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    ".content",
    ".main-content",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".page-content",
    "#content",
    "#main-content",
    "#post-content",
];

/// Containers with less raw text than this are not candidates.
const MIN_CANDIDATE_CHARS: usize = 200;

/// Score bonus per paragraph inside a candidate.
const PARAGRAPH_WEIGHT: usize = 100;

pub struct ReadabilityExtractor {
    id: String,
    fetcher: Arc<PageFetcher>,
}

impl ReadabilityExtractor {
    pub fn new(fetcher: Arc<PageFetcher>) -> Self {
        Self {
            id: "readability".to_string(),
            fetcher,
        }
    }
}

/// Pick the highest-scoring content container, falling back to `<body>`.
///
/// Score is `text length + 100 * paragraph count`, computed after
/// navigation, headers, footers, forms and scripts are dropped.
pub fn extract_readable(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let paragraph = selectors(&["p"]);

    let best = selectors(CONTENT_SELECTORS)
        .iter()
        .flat_map(|selector| document.select(selector).collect::<Vec<_>>())
        .filter_map(|element| {
            let text = visible_text(element, BOILERPLATE_TAGS);
            let length = text.chars().count();
            if length <= MIN_CANDIDATE_CHARS {
                return None;
            }
            let paragraphs = paragraph
                .first()
                .map(|p| element.select(p).count())
                .unwrap_or(0);
            Some((length + paragraphs * PARAGRAPH_WEIGHT, text))
        })
        .max_by_key(|(score, _)| *score);

    if let Some((_, text)) = best {
        let cleaned = clean_text(&text);
        if cleaned.chars().count() > MIN_CONTENT_CHARS {
            return Some(cleaned);
        }
    }

    let body = selectors(&["body"])
        .first()
        .and_then(|s| document.select(s).next())?;
    let cleaned = clean_text(&visible_text(body, BOILERPLATE_TAGS));
    (cleaned.chars().count() > MIN_CONTENT_CHARS).then_some(cleaned)
}

#[async_trait]
impl ContentExtractor for ReadabilityExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    async fn extract(&self, url: &str) -> ProviderResult<ExtractedContent> {
        let html = self.fetcher.fetch(url).await?;
        let text = extract_readable(&html).ok_or(ProviderError::EmptyResult)?;
        debug!(provider = %self.id, url = %url, chars = text.len(), "Readable content extracted");
        accept_content(url, text, &self.id)
    }
}
