//! Text generation adapters (hosted LLM APIs).

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::types::request::{GeneratedText, TextRequest};

/// Prompt sent when checking that a generator's credentials work.
pub const VALIDATION_PROMPT: &str = "Reply with: OK";

/// A hosted model that turns a prompt into text.
///
/// Implementations map every transport error, HTTP status and parse failure
/// into [`ProviderError`](crate::error::ProviderError). A response with no
/// usable text is `ProviderError::EmptyResult`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Registry id of this provider.
    fn id(&self) -> &str;

    /// Generate text for the prompt.
    async fn generate(&self, request: &TextRequest) -> ProviderResult<GeneratedText>;

    /// Make the cheapest call that proves the credentials are accepted.
    ///
    /// An empty answer still counts as valid; only the error matters.
    async fn validate(&self) -> ProviderResult<()> {
        self.generate(&TextRequest::new(VALIDATION_PROMPT, 10))
            .await
            .map(|_| ())
    }
}
