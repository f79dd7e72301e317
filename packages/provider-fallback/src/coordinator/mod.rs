//! Fallback coordination across providers.
//!
//! The coordinator owns one [`Chain`] per capability and the shared result
//! cache. Text generation and extraction walk their chain in priority order
//! and stop at the first usable result. Search fans out to every available
//! engine at once and merges what comes back before the deadline.
//!
//! Only [`FallbackError`] leaves this module. Individual provider failures
//! are recorded in the registry and in the attempt log.

mod builder;
mod chain;
mod merge;
mod validate;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

use crate::cache::{CacheKey, ResultCache};
use crate::clock::Clock;
use crate::error::{FallbackError, ProviderError, ProviderResult, Result};
use crate::traits::{
    extractor::ContentExtractor, generator::TextGenerator, searcher::WebSearcher,
};
use crate::types::attempt::RequestAttempt;
use crate::types::config::CoordinatorConfig;
use crate::types::provider::{Capability, ProviderStatus};
use crate::types::request::{
    ExtractedContent, GeneratedText, Payload, SearchHit, SearchRequest, TextRequest,
};

pub use builder::FallbackCoordinatorBuilder;
pub use chain::Chain;
pub use merge::merge_hits;
pub use validate::{ValidationOutcome, ValidationReport};

/// Provider status grouped by capability, then provider id.
pub type StatusReport = IndexMap<Capability, IndexMap<String, ProviderStatus>>;

/// Priority-ordered fallback over text, search and extraction providers.
///
/// Constructed once by the application and shared behind an `Arc`.
pub struct FallbackCoordinator {
    text: Chain<dyn TextGenerator>,
    search: Chain<dyn WebSearcher>,
    extraction: Chain<dyn ContentExtractor>,
    cache: ResultCache,
    clock: Arc<dyn Clock>,
    config: CoordinatorConfig,
    closed: AtomicBool,
    validation: RwLock<Option<ValidationReport>>,
}

impl FallbackCoordinator {
    pub fn builder() -> FallbackCoordinatorBuilder {
        FallbackCoordinatorBuilder::new()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn text_chain(&self) -> &Chain<dyn TextGenerator> {
        &self.text
    }

    pub fn search_chain(&self) -> &Chain<dyn WebSearcher> {
        &self.search
    }

    pub fn extraction_chain(&self) -> &Chain<dyn ContentExtractor> {
        &self.extraction
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FallbackError::ShutDown);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inbound API
    // ------------------------------------------------------------------

    /// Generate text from the first provider that answers.
    pub async fn resolve_text(&self, prompt: &str, max_tokens: u32) -> Result<GeneratedText> {
        self.resolve_text_request(&TextRequest::new(prompt, max_tokens))
            .await
    }

    /// Like [`resolve_text`](Self::resolve_text) with a full request (system prompt).
    pub async fn resolve_text_request(&self, request: &TextRequest) -> Result<GeneratedText> {
        if request.prompt.trim().is_empty() {
            return Err(FallbackError::InvalidRequest("prompt is empty".into()));
        }
        if request.max_tokens == 0 {
            return Err(FallbackError::InvalidRequest(
                "max_tokens must be positive".into(),
            ));
        }

        let key = CacheKey::for_prompt(request, &self.text.registry.fingerprint());
        self.resolve_sequential(&self.text, Some(&key), |generator: Arc<dyn TextGenerator>| {
            Box::pin(async move { generator.generate(request).await })
        })
        .await
    }

    /// Search every available engine concurrently and merge the results.
    pub async fn resolve_search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.resolve_parallel(&SearchRequest::new(query, max_results))
            .await
    }

    /// Extract cleaned text for an http(s) URL.
    pub async fn resolve_extraction(&self, url: &str) -> Result<ExtractedContent> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| FallbackError::InvalidRequest(format!("invalid url {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FallbackError::InvalidRequest(format!(
                "unsupported url scheme: {}",
                parsed.scheme()
            )));
        }

        let url = parsed.as_str();
        let key = CacheKey::for_url(url, &self.extraction.registry.fingerprint());
        self.resolve_sequential(
            &self.extraction,
            Some(&key),
            |extractor: Arc<dyn ContentExtractor>| {
                Box::pin(async move { extractor.extract(url).await })
            },
        )
        .await
    }

    /// Extract several URLs with bounded concurrency.
    ///
    /// Results are returned in input order. Items still running when the
    /// batch deadline passes resolve to `DeadlineExceeded`. A batch longer
    /// than `max_batch_urls` is rejected whole with `InvalidRequest`.
    pub async fn resolve_extractions(
        &self,
        urls: &[String],
    ) -> Result<Vec<(String, Result<ExtractedContent>)>> {
        if urls.len() > self.config.max_batch_urls {
            return Err(FallbackError::InvalidRequest(format!(
                "batch of {} urls exceeds the limit of {}",
                urls.len(),
                self.config.max_batch_urls
            )));
        }

        let deadline = Instant::now() + self.config.batch_deadline;
        let batch_deadline = self.config.batch_deadline;

        let results: Vec<(String, Result<ExtractedContent>)> = futures::stream::iter(urls.iter().cloned())
            .map(move |url: String| async move {
                let outcome = match timeout_at(deadline, self.resolve_extraction(&url)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(FallbackError::DeadlineExceeded {
                        capability: Capability::Extraction,
                        deadline: batch_deadline,
                    }),
                };
                (url, outcome)
            })
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        let succeeded = results.iter().filter(|(_, r)| r.is_ok()).count();
        info!(
            total = results.len(),
            succeeded,
            "Batch extraction finished"
        );
        Ok(results)
    }

    // ------------------------------------------------------------------
    // Resolution strategies
    // ------------------------------------------------------------------

    /// Try providers one at a time in (priority, error_count) order.
    ///
    /// Rate-limited providers are skipped without a failure. The first
    /// non-empty result is cached and returned; lower-priority providers are
    /// not invoked after it.
    pub async fn resolve_sequential<'r, A, T, F>(
        &self,
        chain: &Chain<A>,
        key: Option<&CacheKey>,
        call: F,
    ) -> Result<T>
    where
        A: ?Sized + Send + Sync,
        T: Payload + Serialize + DeserializeOwned + Send,
        F: Fn(Arc<A>) -> BoxFuture<'r, ProviderResult<T>>,
    {
        self.ensure_open()?;

        let capability = chain.capability();
        let span = info_span!("resolve", %capability, request_id = %Uuid::new_v4());

        async move {
            if let Some(key) = key {
                if let Some(cached) = self.cache.get::<T>(key).await {
                    return Ok(cached);
                }
            }

            let deadline = Instant::now() + self.config.chain_deadline;
            let providers = chain.registry.list_available(self.clock.now());
            let mut attempts = Vec::with_capacity(providers.len());

            for state in providers {
                let id = state.id().to_string();
                let now = self.clock.now();

                let Some(adapter) = chain.adapter(&id) else {
                    attempts.push(RequestAttempt::skipped(&id, now, "no adapter registered"));
                    continue;
                };

                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    attempts.push(RequestAttempt::skipped(&id, now, "chain deadline reached"));
                    continue;
                }

                if !chain.try_dispatch(&state, now) {
                    debug!(provider = %id, "Provider rate limited, skipping");
                    attempts.push(RequestAttempt::skipped(&id, now, "rate limited"));
                    continue;
                }

                let budget = state
                    .config
                    .timeout
                    .unwrap_or(self.config.request_timeout)
                    .min(remaining);

                debug!(provider = %id, ?budget, "Trying provider");
                let error = match timeout(budget, call(adapter)).await {
                    Ok(Ok(value)) if !value.is_empty() => {
                        chain.registry.record_success(&id, self.clock.now());
                        if let Some(key) = key {
                            self.cache.put(key, &value).await;
                        }
                        info!(provider = %id, attempts = attempts.len() + 1, "Provider succeeded");
                        return Ok(value);
                    }
                    Ok(Ok(_)) => ProviderError::EmptyResult,
                    Ok(Err(e)) => e,
                    Err(_) => ProviderError::Timeout(budget),
                };

                chain.registry.record_failure(&id, &error, self.clock.now());
                attempts.push(RequestAttempt::failed(&id, now, &error));
            }

            warn!(attempts = attempts.len(), "All providers failed");
            Err(FallbackError::AllProvidersFailed {
                capability,
                attempts,
            })
        }
        .instrument(span)
        .await
    }

    /// Fan a search out to every available engine and merge the results.
    ///
    /// At most `search_concurrency` engines run at once, each under its own
    /// timeout, and the whole search under `search_deadline`. Whatever has
    /// completed by then is merged. Engines still running at the deadline are
    /// recorded as timeouts; engines that never started are not penalized.
    pub async fn resolve_parallel(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        self.ensure_open()?;

        if request.query.trim().is_empty() {
            return Err(FallbackError::InvalidRequest("query is empty".into()));
        }
        if request.max_results == 0 {
            return Err(FallbackError::InvalidRequest(
                "max_results must be positive".into(),
            ));
        }

        let chain = &self.search;
        let span = info_span!(
            "resolve",
            capability = %Capability::Search,
            request_id = %Uuid::new_v4()
        );

        async move {
            let key = CacheKey::for_query(request, &chain.registry.fingerprint());
            if let Some(cached) = self.cache.get::<Vec<SearchHit>>(&key).await {
                return Ok(cached);
            }

            let now = self.clock.now();
            let mut attempts = Vec::new();
            let mut runnable = Vec::new();

            for state in chain.registry.list_available(now) {
                match chain.adapter(state.id()) {
                    None => attempts.push(RequestAttempt::skipped(
                        state.id(),
                        now,
                        "no adapter registered",
                    )),
                    Some(adapter) => runnable.push((state, adapter, AtomicBool::new(false))),
                }
            }

            let semaphore = Semaphore::new(self.config.search_concurrency.max(1));
            let deadline = Instant::now() + self.config.search_deadline;

            let mut in_flight: FuturesUnordered<_> = runnable
                .iter()
                .enumerate()
                .map(|(index, (state, adapter, started))| {
                    let semaphore = &semaphore;
                    async move {
                        let _permit = semaphore.acquire().await;
                        started.store(true, Ordering::Release);

                        // The slot is claimed only once a permit is held, so
                        // queued searches see every earlier dispatch.
                        let started_at = self.clock.now();
                        if !chain.try_dispatch(state, started_at) {
                            return (index, started_at, None);
                        }

                        let budget = state.config.timeout.unwrap_or(self.config.request_timeout);
                        let result = match timeout(budget, adapter.search(request)).await {
                            Ok(Ok(hits)) if hits.is_empty() => Err(ProviderError::EmptyResult),
                            Ok(result) => result,
                            Err(_) => Err(ProviderError::Timeout(budget)),
                        };
                        (index, started_at, Some(result))
                    }
                })
                .collect();

            let mut finished = vec![false; runnable.len()];
            let mut batches = Vec::new();

            loop {
                match timeout_at(deadline, in_flight.next()).await {
                    Ok(Some((index, started_at, result))) => {
                        finished[index] = true;
                        let (state, _, _) = &runnable[index];
                        match result {
                            None => {
                                debug!(provider = %state.id(), "Provider rate limited, skipping");
                                attempts.push(RequestAttempt::skipped(
                                    state.id(),
                                    started_at,
                                    "rate limited",
                                ));
                            }
                            Some(Ok(hits)) => {
                                debug!(provider = %state.id(), hits = hits.len(), "Search provider returned");
                                chain.registry.record_success(state.id(), self.clock.now());
                                attempts.push(RequestAttempt::success(state.id(), started_at));
                                batches.push((state.priority(), hits));
                            }
                            Some(Err(error)) => {
                                chain
                                    .registry
                                    .record_failure(state.id(), &error, self.clock.now());
                                attempts.push(RequestAttempt::failed(state.id(), started_at, &error));
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(_) => {
                        warn!(
                            deadline = ?self.config.search_deadline,
                            "Search deadline reached, abandoning providers still running"
                        );
                        break;
                    }
                }
            }
            drop(in_flight);

            let now = self.clock.now();
            for (index, (state, _, started)) in runnable.iter().enumerate() {
                if finished[index] {
                    continue;
                }
                if started.load(Ordering::Acquire) {
                    let error = ProviderError::Timeout(self.config.search_deadline);
                    chain.registry.record_failure(state.id(), &error, now);
                    attempts.push(RequestAttempt::failed(state.id(), now, &error));
                } else {
                    attempts.push(RequestAttempt::skipped(
                        state.id(),
                        now,
                        "search deadline reached before start",
                    ));
                }
            }

            if batches.is_empty() {
                warn!(attempts = attempts.len(), "All search providers failed");
                return Err(FallbackError::AllProvidersFailed {
                    capability: Capability::Search,
                    attempts,
                });
            }

            let providers = batches.len();
            let merged = merge_hits(batches, request.max_results);
            if merged.is_empty() {
                return Err(FallbackError::AllProvidersFailed {
                    capability: Capability::Search,
                    attempts,
                });
            }

            info!(providers, results = merged.len(), "Search merged");
            self.cache.put(&key, &merged).await;
            Ok(merged)
        }
        .instrument(span)
        .await
    }

    // ------------------------------------------------------------------
    // Status and maintenance
    // ------------------------------------------------------------------

    /// Status of every provider, grouped by capability.
    pub fn provider_status(&self) -> StatusReport {
        let now = self.clock.now();
        let mut report = IndexMap::new();
        report.insert(Capability::Text, self.text.status(now));
        report.insert(Capability::Search, self.search.status(now));
        report.insert(Capability::Extraction, self.extraction.status(now));
        report
    }

    /// Reset error state for one provider id (in every capability that has
    /// it) or, with `None`, for all providers.
    ///
    /// Returns false if a named provider is not registered anywhere.
    pub fn reset_provider_errors(&self, provider: Option<&str>) -> bool {
        match provider {
            Some(id) => {
                let text = self.text.registry.reset(id);
                let search = self.search.registry.reset(id);
                let extraction = self.extraction.registry.reset(id);
                text || search || extraction
            }
            None => {
                self.text.registry.reset_all();
                self.search.registry.reset_all();
                self.extraction.registry.reset_all();
                true
            }
        }
    }

    /// Drop every cached result. Returns the number of entries removed.
    pub async fn clear_cache(&self) -> usize {
        let removed = self.cache.clear().await;
        info!(removed, "Cache cleared");
        removed
    }

    /// Drop expired cache entries. Returns the number removed.
    pub async fn sweep_cache(&self) -> usize {
        let removed = self.cache.sweep_expired().await;
        debug!(removed, "Cache swept");
        removed
    }

    /// Stop accepting new resolutions and sweep the cache one last time.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let removed = self.cache.sweep_expired().await;
        info!(removed, "Fallback coordinator shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
