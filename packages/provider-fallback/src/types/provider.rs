//! Provider identity, configuration and live health state.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An abstract operation several providers can fulfil interchangeably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Generate text from a prompt
    Text,
    /// Web search returning (title, url, snippet) records
    Search,
    /// Cleaned page text for a URL
    Extraction,
}

impl Capability {
    /// Stable lowercase name, used in cache keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Text => "text",
            Capability::Search => "search",
            Capability::Extraction => "extraction",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static configuration for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique id within its registry
    pub id: String,

    /// Lower is tried first
    pub priority: u32,

    /// Max requests per rolling window (`None` = unlimited)
    pub rate_limit: Option<u32>,

    /// Per-call timeout override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl ProviderConfig {
    /// Create a config with no rate limit and the chain's default timeout.
    pub fn new(id: impl Into<String>, priority: u32) -> Self {
        Self {
            id: id.into(),
            priority,
            rate_limit: None,
            timeout: None,
        }
    }

    /// Cap requests per rolling window.
    pub fn with_rate_limit(mut self, limit: u32) -> Self {
        self.rate_limit = Some(limit);
        self
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Why a provider is currently disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisableReason {
    /// Error count reached the breaker threshold
    ErrorThreshold,
    /// Provider signalled quota exhaustion
    Quota,
    /// Credentials or configuration rejected; needs a manual reset
    Config,
}

/// Mutable health state of one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderState {
    pub config: ProviderConfig,

    /// Credential present at registration
    pub configured: bool,

    pub enabled: bool,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub disabled_until: Option<DateTime<Utc>>,
    pub disable_reason: Option<DisableReason>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl ProviderState {
    /// Initial state: enabled iff configured.
    pub fn new(config: ProviderConfig, configured: bool) -> Self {
        Self {
            config,
            configured,
            enabled: configured,
            error_count: 0,
            last_error: None,
            disabled_until: None,
            disable_reason: None,
            last_success_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn priority(&self) -> u32 {
        self.config.priority
    }

    /// Put the provider back into service with a clean slate.
    pub(crate) fn reenable(&mut self) {
        self.enabled = self.configured;
        self.error_count = 0;
        self.disabled_until = None;
        self.disable_reason = None;
    }

    /// Whether a quota disable is still in force at `now`.
    pub fn quota_blocked(&self, now: DateTime<Utc>) -> bool {
        self.disable_reason == Some(DisableReason::Quota)
            && self.disabled_until.is_some_and(|until| until > now)
    }
}

/// Snapshot of a provider exposed to the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub enabled: bool,
    pub configured: bool,
    pub priority: u32,
    pub error_count: u32,
    pub rate_limited: bool,
    pub last_error: Option<String>,
    pub disabled_until: Option<DateTime<Utc>>,
    pub disable_reason: Option<DisableReason>,
    pub requests_in_window: usize,
    pub rate_limit: Option<u32>,
}
