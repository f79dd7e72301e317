use std::fmt;

use sha2::{Digest, Sha256};
use url::Url;

use crate::types::provider::Capability;
use crate::types::request::{SearchRequest, TextRequest};

/// Content-addressed cache key.
///
/// Hex SHA-256 over the capability name, the provider-set fingerprint and the
/// normalized request. Two requests that differ only in insignificant
/// formatting map to the same key; a change in the registered providers
/// yields a new key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a text-generation prompt.
    pub fn for_prompt(request: &TextRequest, fingerprint: &str) -> Self {
        let normalized = format!(
            "{}\u{1f}{}\u{1f}{}",
            request.system.as_deref().map(str::trim).unwrap_or_default(),
            request.prompt.trim(),
            request.max_tokens
        );
        Self::build(Capability::Text, fingerprint, &normalized)
    }

    /// Key for a search query.
    pub fn for_query(request: &SearchRequest, fingerprint: &str) -> Self {
        let normalized = format!(
            "{}\u{1f}{}",
            normalize_query(&request.query),
            request.max_results
        );
        Self::build(Capability::Search, fingerprint, &normalized)
    }

    /// Key for a page extraction.
    pub fn for_url(url: &str, fingerprint: &str) -> Self {
        Self::build(Capability::Extraction, fingerprint, &normalize_url(url))
    }

    fn build(capability: Capability, fingerprint: &str, normalized: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(capability.as_str().as_bytes());
        hasher.update([0x1e]);
        hasher.update(fingerprint.as_bytes());
        hasher.update([0x1e]);
        hasher.update(normalized.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase and collapse whitespace.
pub fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical form of a URL for caching and deduplication.
///
/// Drops the fragment and a trailing slash, lowercases scheme and host.
/// Strings that do not parse as URLs are trimmed and lowercased.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            let mut normalized = url.to_string();
            if url.query().is_none() && normalized.ends_with('/') {
                normalized.pop();
            }
            normalized
        }
        Err(_) => trimmed.to_lowercase(),
    }
}
