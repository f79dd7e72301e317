//! Jina Reader API (`r.jina.ai`), which renders a page and returns plain text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::clean::truncate_chars;
use crate::error::{ProviderError, ProviderResult};
use crate::providers::http::{api_client, send};
use crate::security::SecretString;
use crate::traits::extractor::{accept_content, ContentExtractor};
use crate::types::request::ExtractedContent;

const DEFAULT_BASE_URL: &str = "https://r.jina.ai/";

/// Small, stable page read when checking the API key.
const VALIDATION_URL: &str = "https://example.com/";

/// Reader output is cut at this many characters.
pub const MAX_READER_CHARS: usize = 20_000;

/// Shortest body treated as real content rather than an error page.
const MIN_READER_CHARS: usize = 50;

pub struct JinaReaderExtractor {
    id: String,
    api_key: SecretString,
    base_url: String,
    client: Client,
}

impl JinaReaderExtractor {
    pub fn new(api_key: SecretString, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            id: "jina".to_string(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: api_client(timeout)?,
        })
    }

    /// Override the reader endpoint. The target URL is appended to it.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base = base_url.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        self.base_url = base;
        self
    }
}

/// Reject bodies that look like reader errors, cap the rest.
fn validate_reader_text(body: &str) -> ProviderResult<String> {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MIN_READER_CHARS || trimmed.starts_with("Error") {
        let preview: String = trimmed.chars().take(100).collect();
        return Err(ProviderError::InvalidResponse(format!(
            "suspicious reader output: {}",
            preview
        )));
    }
    Ok(truncate_chars(trimmed, MAX_READER_CHARS))
}

#[async_trait]
impl ContentExtractor for JinaReaderExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    async fn extract(&self, url: &str) -> ProviderResult<ExtractedContent> {
        let response = send(
            self.client
                .get(format!("{}{}", self.base_url, url))
                .bearer_auth(self.api_key.expose())
                .header("X-Return-Format", "text"),
        )
        .await?;

        let body = response.text().await?;
        let text = validate_reader_text(&body).inspect_err(|e| {
            warn!(provider = %self.id, url = %url, error = %e, "Reader output rejected");
        })?;

        debug!(provider = %self.id, url = %url, chars = text.len(), "Reader extracted text");
        accept_content(url, text, &self.id)
    }

    /// Read a known page; only the status is checked. The reader also works
    /// without a key, so an empty key has nothing to verify.
    async fn validate(&self) -> ProviderResult<()> {
        if self.api_key.is_empty() {
            return Ok(());
        }
        send(
            self.client
                .get(format!("{}{}", self.base_url, VALIDATION_URL))
                .bearer_auth(self.api_key.expose())
                .header("X-Return-Format", "text"),
        )
        .await
        .map(|_| ())
    }
}
