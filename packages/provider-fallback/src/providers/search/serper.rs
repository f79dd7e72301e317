//! Serper (google.serper.dev) search API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{rank_hits, SearchLocale};
use crate::error::ProviderResult;
use crate::providers::http::{api_client, send};
use crate::security::SecretString;
use crate::traits::searcher::WebSearcher;
use crate::types::request::{SearchHit, SearchRequest};

const DEFAULT_BASE_URL: &str = "https://google.serper.dev";

pub struct SerperSearch {
    id: String,
    api_key: SecretString,
    locale: SearchLocale,
    base_url: String,
    client: Client,
}

impl SerperSearch {
    pub fn new(api_key: SecretString, locale: SearchLocale, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            id: "serper".to_string(),
            api_key,
            locale,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: api_client(timeout)?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    gl: &'a str,
    hl: &'a str,
    num: usize,
    autocorrect: bool,
    page: u32,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl WebSearcher for SerperSearch {
    fn id(&self) -> &str {
        &self.id
    }

    async fn search(&self, request: &SearchRequest) -> ProviderResult<Vec<SearchHit>> {
        let body = SerperRequest {
            q: &request.query,
            gl: &self.locale.country,
            hl: &self.locale.language,
            num: request.max_results,
            autocorrect: true,
            page: 1,
        };

        let response = send(
            self.client
                .post(format!("{}/search", self.base_url))
                .header("X-API-KEY", self.api_key.expose())
                .json(&body),
        )
        .await?;

        let parsed: SerperResponse = response.json().await?;
        let hits = rank_hits(
            parsed
                .organic
                .into_iter()
                .map(|r| (r.title, r.link, r.snippet)),
            &self.id,
            request.max_results,
        );
        debug!(provider = %self.id, hits = hits.len(), "Serper search completed");
        Ok(hits)
    }
}
