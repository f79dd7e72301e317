//! Web search adapters.

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::types::request::{SearchHit, SearchRequest};

/// A search engine, API-based or scraped.
///
/// Hits are returned in the engine's own order with `rank` starting at 1.
/// Hits without a title or an http(s) url are dropped by the adapter.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    fn id(&self) -> &str;

    async fn search(&self, request: &SearchRequest) -> ProviderResult<Vec<SearchHit>>;

    /// Run a one-result query to check the engine accepts our credentials.
    async fn validate(&self) -> ProviderResult<()> {
        self.search(&SearchRequest::new("test", 1)).await.map(|_| ())
    }
}
