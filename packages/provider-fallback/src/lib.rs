//! Multi-Provider Fallback Core
//!
//! Resolves text generation, web search and page extraction requests across
//! interchangeable external providers, so report generation keeps working
//! when any single provider is down, throttled or out of quota.
//!
//! # Design
//!
//! - Providers are tried in priority order; the first usable result wins
//! - Search fans out to every engine and merges results by URL
//! - Failing providers are disabled by a per-provider circuit breaker
//! - Successful results are cached by content hash with a TTL
//! - Callers see one [`FallbackError`], never a provider error
//!
//! # Usage
//!
//! ```rust,ignore
//! use provider_fallback::{FallbackCoordinator, ProviderConfig};
//! use provider_fallback::testing::{MockSearcher, MockTextGenerator};
//!
//! let coordinator = FallbackCoordinator::builder()
//!     .text_provider(ProviderConfig::new("gemini", 1), true, Arc::new(MockTextGenerator::new("gemini")))
//!     .search_provider(ProviderConfig::new("serper", 2), true, Arc::new(MockSearcher::new("serper")))
//!     .build();
//!
//! let text = coordinator.resolve_text("Summarize the coffee market", 500).await?;
//! let hits = coordinator.resolve_search("café especial brasil", 10).await?;
//! ```
//!
//! # Modules
//!
//! - [`coordinator`] - Sequential and parallel resolution strategies
//! - [`registry`] - Provider health state and circuit breaker
//! - [`rate_limiter`] - Sliding-window request limits
//! - [`cache`] - TTL result cache (memory, optional SQLite)
//! - [`traits`] - Adapter traits per capability
//! - [`providers`] - HTTP adapters for LLM, search and extraction services
//! - [`security`] - Credential handling
//! - [`testing`] - Mock adapters and a manual clock

pub mod cache;
pub mod clock;
pub mod coordinator;
pub mod error;
pub mod providers;
pub mod rate_limiter;
pub mod registry;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{CacheError, FailureKind, FallbackError, ProviderError, ProviderResult, Result};
pub use types::{
    AttemptOutcome, BreakerPolicy, CacheConfig, Capability, CoordinatorConfig, DisableReason,
    ExtractedContent, GeneratedText, Payload, ProviderConfig, ProviderState, ProviderStatus,
    RequestAttempt, SearchHit, SearchRequest, TextRequest,
};

pub use coordinator::{
    merge_hits, Chain, FallbackCoordinator, FallbackCoordinatorBuilder, StatusReport,
    ValidationOutcome, ValidationReport,
};
pub use registry::ProviderRegistry;
pub use rate_limiter::RateLimiter;
pub use clock::{Clock, SystemClock};

// Re-export cache
pub use cache::{CacheKey, CacheStore, MemoryCacheStore, ResultCache};

#[cfg(feature = "sqlite")]
pub use cache::SqliteCacheStore;

// Re-export adapter traits
pub use traits::{
    extractor::ContentExtractor, generator::TextGenerator, searcher::WebSearcher,
};

pub use security::SecretString;
