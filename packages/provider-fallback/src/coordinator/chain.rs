use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::rate_limiter::RateLimiter;
use crate::registry::ProviderRegistry;
use crate::types::config::BreakerPolicy;
use crate::types::provider::{Capability, ProviderConfig, ProviderState, ProviderStatus};

/// One capability's providers: registry, rate limiter and adapters by id.
pub struct Chain<A: ?Sized> {
    pub(crate) registry: ProviderRegistry,
    pub(crate) limiter: RateLimiter,
    adapters: HashMap<String, Arc<A>>,
}

impl<A: ?Sized> Chain<A> {
    pub(crate) fn new(capability: Capability, policy: BreakerPolicy) -> Self {
        let limiter = RateLimiter::new(policy.rate_window);
        Self {
            registry: ProviderRegistry::new(capability, policy),
            limiter,
            adapters: HashMap::new(),
        }
    }

    pub(crate) fn register(&mut self, config: ProviderConfig, configured: bool, adapter: Arc<A>) {
        self.adapters.insert(config.id.clone(), adapter);
        self.registry.register(config, configured);
    }

    pub(crate) fn adapter(&self, id: &str) -> Option<Arc<A>> {
        self.adapters.get(id).cloned()
    }

    pub fn capability(&self) -> Capability {
        self.registry.capability()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Whether the provider is held back by its rate limit or a quota disable.
    pub(crate) fn is_rate_limited(&self, state: &ProviderState, now: DateTime<Utc>) -> bool {
        state.quota_blocked(now) || !self.limiter.allow(state.id(), state.config.rate_limit, now)
    }

    /// Claim a request slot for `state`, or report it held back.
    ///
    /// The rate-limit check and the request record happen under one lock, so
    /// concurrent resolutions cannot both take the last slot.
    pub(crate) fn try_dispatch(&self, state: &ProviderState, now: DateTime<Utc>) -> bool {
        !state.quota_blocked(now) && self.limiter.try_acquire(state.id(), state.config.rate_limit, now)
    }

    /// Status of every provider in registration order.
    pub(crate) fn status(&self, now: DateTime<Utc>) -> IndexMap<String, ProviderStatus> {
        self.registry
            .snapshot()
            .into_iter()
            .map(|state| {
                let status = ProviderStatus {
                    enabled: state.enabled,
                    configured: state.configured,
                    priority: state.priority(),
                    error_count: state.error_count,
                    rate_limited: self.is_rate_limited(&state, now),
                    last_error: state.last_error.clone(),
                    disabled_until: state.disabled_until,
                    disable_reason: state.disable_reason,
                    requests_in_window: self.limiter.in_window(state.id(), now),
                    rate_limit: state.config.rate_limit,
                };
                (state.config.id, status)
            })
            .collect()
    }
}
