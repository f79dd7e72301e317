//! Selector sets tuned per kind of site, chosen from the URL's domain.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

use super::clean::{clean_text, visible_text, BOILERPLATE_TAGS};
use crate::error::{ProviderError, ProviderResult};
use crate::providers::html::{select_first_nonempty, selectors};
use crate::providers::http::PageFetcher;
use crate::traits::extractor::{accept_content, ContentExtractor, MIN_CONTENT_CHARS};
use crate::types::request::ExtractedContent;

const NEWS_DOMAINS: &[&str] = &[
    "g1.com",
    "folha.uol.com",
    "estadao.com.br",
    "valor.com.br",
    "exame.com",
    "canaltech.com.br",
    "tecmundo.com.br",
];
const BLOG_DOMAINS: &[&str] = &["medium.com", "wordpress.com", "blogspot.com"];
const ECOMMERCE_DOMAINS: &[&str] = &["mercadolivre.com", "amazon.com", "americanas.com"];

const NEWS_SELECTORS: &[&str] = &[
    ".content-text",
    ".article-body",
    ".post-content",
    ".entry-content",
    ".news-content",
    ".article-content",
    "[itemprop=\"articleBody\"]",
    ".story-body",
];
const BLOG_SELECTORS: &[&str] = &[
    ".post-content",
    ".entry-content",
    ".blog-content",
    ".article-content",
    ".content",
    "article",
];
const ECOMMERCE_SELECTORS: &[&str] = &[
    ".product-description",
    ".item-description",
    ".product-details",
    ".description",
    ".specs",
];
const GENERIC_SELECTORS: &[&str] = &[
    "main",
    "article",
    "div[class*=\"content\"]",
    "section[class*=\"content\"]",
    "div[class*=\"main\"]",
    "div[class*=\"article\"]",
    "div[class*=\"post\"]",
    "div[class*=\"entry\"]",
    "div[class*=\"body\"]",
    "div[id*=\"content\"]",
    "div[id*=\"main\"]",
    "div[id*=\"article\"]",
];

/// A news or blog block must be longer than this to be used.
const MIN_BLOCK_CHARS: usize = 200;

/// Product description fragments shorter than this are skipped.
const MIN_FRAGMENT_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    News,
    Blog,
    Ecommerce,
    Generic,
}

impl SiteKind {
    /// Classify by domain substring. Unparseable URLs are generic.
    pub fn for_url(url: &str) -> Self {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_default();

        let matches = |domains: &[&str]| domains.iter().any(|d| host.contains(d));
        if matches(NEWS_DOMAINS) {
            SiteKind::News
        } else if matches(BLOG_DOMAINS) {
            SiteKind::Blog
        } else if matches(ECOMMERCE_DOMAINS) {
            SiteKind::Ecommerce
        } else {
            SiteKind::Generic
        }
    }
}

pub struct SiteSpecificExtractor {
    id: String,
    fetcher: Arc<PageFetcher>,
}

impl SiteSpecificExtractor {
    pub fn new(fetcher: Arc<PageFetcher>) -> Self {
        Self {
            id: "site_specific".to_string(),
            fetcher,
        }
    }
}

fn cleaned(element: ElementRef<'_>) -> String {
    clean_text(&visible_text(element, BOILERPLATE_TAGS))
}

/// First selector whose first match cleans to more than `min_chars`.
fn first_substantial(document: &Html, patterns: &[&str], min_chars: usize) -> Option<String> {
    selectors(patterns).iter().find_map(|selector| {
        let text = cleaned(document.select(selector).next()?);
        (text.chars().count() > min_chars).then_some(text)
    })
}

fn extract_product(document: &Html) -> Option<String> {
    let parts: Vec<String> = selectors(ECOMMERCE_SELECTORS)
        .iter()
        .flat_map(|selector| document.select(selector).collect::<Vec<_>>())
        .map(|element| visible_text(element, BOILERPLATE_TAGS).trim().to_string())
        .filter(|text| text.chars().count() > MIN_FRAGMENT_CHARS)
        .collect();

    if parts.is_empty() {
        return None;
    }
    Some(clean_text(&parts.join("\n\n")))
}

fn extract_generic(document: &Html) -> Option<String> {
    let element = select_first_nonempty(document, GENERIC_SELECTORS)
        .into_iter()
        .next()
        .or_else(|| select_first_nonempty(document, &["body"]).into_iter().next())?;
    Some(cleaned(element))
}

/// Extract text using the selector set for `kind`.
pub fn extract_for_site(html: &str, kind: SiteKind) -> Option<String> {
    let document = Html::parse_document(html);
    let text = match kind {
        SiteKind::News => first_substantial(&document, NEWS_SELECTORS, MIN_BLOCK_CHARS),
        SiteKind::Blog => first_substantial(&document, BLOG_SELECTORS, MIN_BLOCK_CHARS),
        SiteKind::Ecommerce => extract_product(&document),
        SiteKind::Generic => extract_generic(&document),
    }?;
    (text.chars().count() > MIN_CONTENT_CHARS).then_some(text)
}

#[async_trait]
impl ContentExtractor for SiteSpecificExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    async fn extract(&self, url: &str) -> ProviderResult<ExtractedContent> {
        let kind = SiteKind::for_url(url);
        let html = self.fetcher.fetch(url).await?;
        let text = extract_for_site(&html, kind).ok_or(ProviderError::EmptyResult)?;
        debug!(provider = %self.id, url = %url, site = ?kind, chars = text.len(), "Site-specific content extracted");
        accept_content(url, text, &self.id)
    }
}
