//! Core data types.

pub mod attempt;
pub mod config;
pub mod provider;
pub mod request;

pub use attempt::{AttemptOutcome, RequestAttempt};
pub use config::{BreakerPolicy, CacheConfig, CoordinatorConfig};
pub use provider::{Capability, DisableReason, ProviderConfig, ProviderState, ProviderStatus};
pub use request::{
    ExtractedContent, GeneratedText, Payload, SearchHit, SearchRequest, TextRequest,
};
