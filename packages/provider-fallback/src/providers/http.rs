//! Shared HTTP plumbing for adapters.
//!
//! Every adapter funnels non-2xx responses through [`classify_status`] so the
//! registry sees the same failure classes regardless of provider:
//!
//! | Status            | Error                            |
//! |-------------------|----------------------------------|
//! | 429, quota body   | `QuotaExceeded` (long disable)   |
//! | 401, 403          | `Config` (manual reset)          |
//! | 5xx               | `Transport`                      |
//! | other 4xx         | `InvalidResponse`                |

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Browser user agents rotated across scraping requests.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

/// Max characters of an error body kept in messages.
const ERROR_BODY_CHARS: usize = 300;

/// Build a JSON API client with a request timeout.
pub fn api_client(timeout: Duration) -> ProviderResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Config(format!("failed to create HTTP client: {}", e)))
}

/// Map a non-success status and its body to a provider error.
pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let snippet: String = body.chars().take(ERROR_BODY_CHARS).collect();
    let message = format!("HTTP {}: {}", status.as_u16(), snippet.trim());
    let lowered = body.to_lowercase();

    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::QuotaExceeded(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Config(message),
        _ if lowered.contains("quota") => ProviderError::QuotaExceeded(message),
        s if s.is_server_error() => ProviderError::Transport(message),
        _ => ProviderError::InvalidResponse(message),
    }
}

/// Send a request and turn any non-2xx status into a classified error.
pub async fn send(request: RequestBuilder) -> ProviderResult<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, &body))
}

/// Fetches HTML pages with browser-like headers.
///
/// Used by the scraping search engines and the local extraction strategies.
/// The user agent rotates round-robin over [`USER_AGENTS`].
pub struct PageFetcher {
    client: Client,
    next_agent: AtomicUsize,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            next_agent: AtomicUsize::new(0),
        })
    }

    /// Next user agent in rotation.
    pub fn user_agent(&self) -> &'static str {
        let index = self.next_agent.fetch_add(1, Ordering::Relaxed);
        USER_AGENTS[index % USER_AGENTS.len()]
    }

    /// GET a page and return its body.
    pub async fn fetch(&self, url: &str) -> ProviderResult<String> {
        self.fetch_with_query(url, &[]).await
    }

    /// GET a page with query parameters and return its body.
    pub async fn fetch_with_query(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> ProviderResult<String> {
        let request = self
            .client
            .get(url)
            .query(query)
            .header(header::USER_AGENT, self.user_agent());

        let response = send(request).await?;
        let body = response.text().await?;
        debug!(url = %url, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}
