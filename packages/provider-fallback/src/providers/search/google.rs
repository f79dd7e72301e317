//! Google Custom Search JSON API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{rank_hits, SearchLocale};
use crate::error::{ProviderError, ProviderResult};
use crate::providers::http::{api_client, classify_status};
use crate::security::SecretString;
use crate::traits::searcher::WebSearcher;
use crate::types::request::{SearchHit, SearchRequest};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// The API returns at most 10 results per request.
const MAX_PER_REQUEST: usize = 10;

pub struct GoogleCustomSearch {
    id: String,
    api_key: SecretString,
    engine_id: String,
    locale: SearchLocale,
    base_url: String,
    client: Client,
}

impl GoogleCustomSearch {
    pub fn new(
        api_key: SecretString,
        engine_id: impl Into<String>,
        locale: SearchLocale,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        Ok(Self {
            id: "google".to_string(),
            api_key,
            engine_id: engine_id.into(),
            locale,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: api_client(timeout)?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Item>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// Classify an API error message.
///
/// Quota and daily-limit messages are quota failures even on 403; messages
/// about invalid keys or engine ids are configuration failures.
fn classify_api_error(message: &str) -> Option<ProviderError> {
    let lowered = message.to_lowercase();
    if lowered.contains("quota") || lowered.contains("limit") {
        Some(ProviderError::QuotaExceeded(message.to_string()))
    } else if lowered.contains("invalid") {
        Some(ProviderError::Config(message.to_string()))
    } else {
        None
    }
}

/// Map an error status, preferring the message in Google's error envelope.
fn classify_error(status: StatusCode, body: &str) -> ProviderError {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| classify_api_error(&envelope.error.message))
        .unwrap_or_else(|| classify_status(status, body))
}

fn parse_response(
    response: SearchResponse,
    source: &str,
    max_results: usize,
) -> ProviderResult<Vec<SearchHit>> {
    if let Some(error) = response.error {
        return Err(classify_api_error(&error.message)
            .unwrap_or(ProviderError::InvalidResponse(error.message)));
    }
    Ok(rank_hits(
        response
            .items
            .into_iter()
            .map(|item| (item.title, item.link, item.snippet)),
        source,
        max_results,
    ))
}

#[async_trait]
impl WebSearcher for GoogleCustomSearch {
    fn id(&self) -> &str {
        &self.id
    }

    async fn search(&self, request: &SearchRequest) -> ProviderResult<Vec<SearchHit>> {
        let num = request.max_results.clamp(1, MAX_PER_REQUEST).to_string();
        let language = format!("lang_{}", self.locale.language);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.expose()),
                ("cx", self.engine_id.as_str()),
                ("q", request.query.as_str()),
                ("num", num.as_str()),
                ("lr", language.as_str()),
                ("gl", self.locale.country.as_str()),
                ("safe", "off"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        let parsed: SearchResponse = serde_json::from_str(&body)?;
        let hits = parse_response(parsed, &self.id, request.max_results)?;
        debug!(provider = %self.id, hits = hits.len(), "Google search completed");
        Ok(hits)
    }
}
