//! Content extraction strategies.

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::types::request::ExtractedContent;

/// Minimum trimmed length for extracted text to count as content.
pub const MIN_CONTENT_CHARS: usize = 100;

/// One technique for turning a URL into cleaned page text.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    fn id(&self) -> &str;

    /// Extract text from the page at `url`.
    ///
    /// Text shorter than [`MIN_CONTENT_CHARS`] is `ProviderError::EmptyResult`.
    async fn extract(&self, url: &str) -> ProviderResult<ExtractedContent>;

    /// Check credentials up front. Strategies that hold none have nothing
    /// to verify.
    async fn validate(&self) -> ProviderResult<()> {
        Ok(())
    }
}

/// Wrap text as content if it is long enough.
pub fn accept_content(
    url: &str,
    text: String,
    strategy: &str,
) -> ProviderResult<ExtractedContent> {
    if text.trim().chars().count() <= MIN_CONTENT_CHARS {
        return Err(crate::error::ProviderError::EmptyResult);
    }
    Ok(ExtractedContent {
        url: url.to_string(),
        text,
        strategy: strategy.to_string(),
    })
}
