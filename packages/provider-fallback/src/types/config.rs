//! Tunables for the breaker, cache and coordinator.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Circuit-breaker policy shared by every registry.
#[derive(Debug, Clone)]
pub struct BreakerPolicy {
    /// Consecutive generic failures before a provider is disabled
    pub error_threshold: u32,

    /// Disable period after the threshold is reached
    pub cooldown: Duration,

    /// Disable period after an explicit quota signal
    pub quota_cooldown: Duration,

    /// Rolling window for per-provider rate limits
    pub rate_window: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            error_threshold: 5,
            cooldown: Duration::from_secs(3600),
            quota_cooldown: Duration::from_secs(24 * 3600),
            rate_window: Duration::from_secs(3600),
        }
    }
}

impl BreakerPolicy {
    pub fn with_error_threshold(mut self, threshold: u32) -> Self {
        self.error_threshold = threshold.max(1);
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_quota_cooldown(mut self, cooldown: Duration) -> Self {
        self.quota_cooldown = cooldown;
        self
    }

    pub fn with_rate_window(mut self, window: Duration) -> Self {
        self.rate_window = window;
        self
    }
}

/// Result cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Timeouts and concurrency for resolution.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Default per-provider call timeout
    pub request_timeout: Duration,

    /// Overall budget for a sequential chain
    pub chain_deadline: Duration,

    /// Overall budget for a parallel search
    pub search_deadline: Duration,

    /// Max providers in flight during a parallel search
    pub search_concurrency: usize,

    /// Max URLs extracted at once in a batch
    pub batch_concurrency: usize,

    /// Overall budget for a batch extraction
    pub batch_deadline: Duration,

    /// Largest batch accepted; bigger ones are rejected as invalid
    pub max_batch_urls: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            chain_deadline: Duration::from_secs(180),
            search_deadline: Duration::from_secs(60),
            search_concurrency: 4,
            batch_concurrency: 5,
            batch_deadline: Duration::from_secs(120),
            max_batch_urls: 50,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_chain_deadline(mut self, deadline: Duration) -> Self {
        self.chain_deadline = deadline;
        self
    }

    pub fn with_search_deadline(mut self, deadline: Duration) -> Self {
        self.search_deadline = deadline;
        self
    }

    pub fn with_search_concurrency(mut self, limit: usize) -> Self {
        self.search_concurrency = limit.max(1);
        self
    }

    pub fn with_batch_concurrency(mut self, limit: usize) -> Self {
        self.batch_concurrency = limit.max(1);
        self
    }

    pub fn with_max_batch_urls(mut self, limit: usize) -> Self {
        self.max_batch_urls = limit;
        self
    }
}

/// `now + duration`, saturating instead of panicking on overflow.
pub(crate) fn after(now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `now - duration`, saturating at the earliest representable time.
pub(crate) fn before(now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
