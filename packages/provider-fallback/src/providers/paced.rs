//! Request pacing for scraping adapters.
//!
//! Scraped engines and sites throttle clients that hit them in bursts.
//! [`Paced`] wraps an adapter and spaces its calls using the governor crate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;

use crate::error::ProviderResult;
use crate::traits::{extractor::ContentExtractor, searcher::WebSearcher};
use crate::types::request::{ExtractedContent, SearchHit, SearchRequest};

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Default spacing between scraping requests.
pub const DEFAULT_PACING: Duration = Duration::from_millis(1500);

/// An adapter wrapper that waits for a permit before each call.
pub struct Paced<A> {
    inner: A,
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl<A> Paced<A> {
    /// Allow one call per `interval`. A zero interval disables pacing.
    pub fn new(inner: A, interval: Duration) -> Self {
        let limiter = Quota::with_period(interval)
            .map(|quota| Arc::new(RateLimiter::direct(quota.allow_burst(nonzero!(1u32)))));
        Self { inner, limiter }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    async fn wait_for_permit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[async_trait]
impl<A: WebSearcher> WebSearcher for Paced<A> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn search(&self, request: &SearchRequest) -> ProviderResult<Vec<SearchHit>> {
        self.wait_for_permit().await;
        self.inner.search(request).await
    }
}

#[async_trait]
impl<A: ContentExtractor> ContentExtractor for Paced<A> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn extract(&self, url: &str) -> ProviderResult<ExtractedContent> {
        self.wait_for_permit().await;
        self.inner.extract(url).await
    }
}

/// Extension trait for wrapping adapters.
pub trait PacedExt: Sized {
    /// Space calls at least `interval` apart.
    fn paced(self, interval: Duration) -> Paced<Self> {
        Paced::new(self, interval)
    }
}

impl<A> PacedExt for A {}
