//! Requests accepted by the coordinator and the payloads providers return.

use serde::{Deserialize, Serialize};

/// A payload that can be checked for usable content.
///
/// Empty payloads count as provider failures and are never cached.
pub trait Payload {
    fn is_empty(&self) -> bool;
}

/// Prompt for a text-generation provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRequest {
    pub prompt: String,
    pub max_tokens: u32,

    /// Optional system instruction for chat-style APIs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            system: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Query for a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            max_results,
        }
    }
}

/// Text produced by a generation provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub text: String,
    pub provider: String,
}

impl Payload for GeneratedText {
    fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,

    /// Provider that returned this hit
    pub source: String,

    /// 1-based position in the provider's own result list
    pub rank: usize,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
        source: impl Into<String>,
        rank: usize,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            source: source.into(),
            rank,
        }
    }

    /// A hit is usable if it has a title and an http(s) url.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
            && (self.url.starts_with("http://") || self.url.starts_with("https://"))
    }
}

impl Payload for Vec<SearchHit> {
    fn is_empty(&self) -> bool {
        <[SearchHit]>::is_empty(self)
    }
}

/// Cleaned page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub url: String,
    pub text: String,

    /// Extractor that produced the text
    pub strategy: String,
}

impl Payload for ExtractedContent {
    fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
