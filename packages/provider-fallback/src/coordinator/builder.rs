use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use crate::cache::{CacheStore, MemoryCacheStore, ResultCache};
use crate::clock::{Clock, SystemClock};
use crate::traits::{
    extractor::ContentExtractor, generator::TextGenerator, searcher::WebSearcher,
};
use crate::types::config::{BreakerPolicy, CacheConfig, CoordinatorConfig};
use crate::types::provider::{Capability, ProviderConfig};

use super::{Chain, FallbackCoordinator};

type Registration<A> = (ProviderConfig, bool, Arc<A>);

/// Builder for [`FallbackCoordinator`].
///
/// ```rust,ignore
/// let coordinator = FallbackCoordinator::builder()
///     .breaker_policy(BreakerPolicy::default().with_error_threshold(3))
///     .text_provider(ProviderConfig::new("gemini", 1), true, Arc::new(gemini))
///     .search_provider(ProviderConfig::new("serper", 2).with_rate_limit(2500), true, Arc::new(serper))
///     .extractor(ProviderConfig::new("readability", 2), true, Arc::new(ReadabilityExtractor::new(fetcher)))
///     .build();
/// ```
pub struct FallbackCoordinatorBuilder {
    policy: BreakerPolicy,
    cache_config: CacheConfig,
    config: CoordinatorConfig,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn CacheStore>>,
    text: Vec<Registration<dyn TextGenerator>>,
    search: Vec<Registration<dyn WebSearcher>>,
    extraction: Vec<Registration<dyn ContentExtractor>>,
}

impl Default for FallbackCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackCoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            policy: BreakerPolicy::default(),
            cache_config: CacheConfig::default(),
            config: CoordinatorConfig::default(),
            clock: Arc::new(SystemClock),
            store: None,
            text: Vec::new(),
            search: Vec::new(),
            extraction: Vec::new(),
        }
    }

    pub fn breaker_policy(mut self, policy: BreakerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cache backend. Defaults to [`MemoryCacheStore`].
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register a text generator. `configured` is false when its credential is missing.
    pub fn text_provider(
        mut self,
        config: ProviderConfig,
        configured: bool,
        adapter: Arc<dyn TextGenerator>,
    ) -> Self {
        self.text.push((config, configured, adapter));
        self
    }

    pub fn search_provider(
        mut self,
        config: ProviderConfig,
        configured: bool,
        adapter: Arc<dyn WebSearcher>,
    ) -> Self {
        self.search.push((config, configured, adapter));
        self
    }

    pub fn extractor(
        mut self,
        config: ProviderConfig,
        configured: bool,
        adapter: Arc<dyn ContentExtractor>,
    ) -> Self {
        self.extraction.push((config, configured, adapter));
        self
    }

    pub fn build(self) -> FallbackCoordinator {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCacheStore::new()));

        FallbackCoordinator {
            text: chain(Capability::Text, &self.policy, self.text),
            search: chain(Capability::Search, &self.policy, self.search),
            extraction: chain(Capability::Extraction, &self.policy, self.extraction),
            cache: ResultCache::new(store, self.cache_config, self.clock.clone()),
            clock: self.clock,
            config: self.config,
            closed: AtomicBool::new(false),
            validation: RwLock::new(None),
        }
    }
}

fn chain<A: ?Sized>(
    capability: Capability,
    policy: &BreakerPolicy,
    registrations: Vec<Registration<A>>,
) -> Chain<A> {
    let mut chain = Chain::new(capability, policy.clone());
    for (config, configured, adapter) in registrations {
        chain.register(config, configured, adapter);
    }
    chain
}
