//! Test harness that serves the real router over scripted providers.
//!
//! Requests go through `tower::ServiceExt::oneshot`, so no socket is bound
//! and no provider is contacted over the network.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use provider_fallback::testing::{MockExtractor, MockSearcher, MockTextGenerator};
use provider_fallback::{FallbackCoordinator, ProviderConfig};
use serde_json::Value;
use server_core::server::build_app;
use tower::ServiceExt;

/// Scripted providers plus the app built over them.
pub struct TestHarness {
    pub gemini: Arc<MockTextGenerator>,
    pub openai: Arc<MockTextGenerator>,
    pub serper: Arc<MockSearcher>,
    pub duckduckgo: Arc<MockSearcher>,
    pub jina: Arc<MockExtractor>,
    pub coordinator: Arc<FallbackCoordinator>,
    app: Router,
}

impl TestHarness {
    pub fn new() -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let gemini = Arc::new(MockTextGenerator::new("gemini"));
        let openai = Arc::new(MockTextGenerator::new("openai"));
        let serper = Arc::new(
            MockSearcher::new("serper").with_hits(&["https://a.com/", "https://b.com/"]),
        );
        let duckduckgo = Arc::new(
            MockSearcher::new("duckduckgo").with_hits(&["https://b.com/", "https://c.com/"]),
        );
        let jina = Arc::new(MockExtractor::new("jina"));

        let coordinator = Arc::new(
            FallbackCoordinator::builder()
                .text_provider(ProviderConfig::new("gemini", 1), true, gemini.clone())
                .text_provider(ProviderConfig::new("openai", 2), true, openai.clone())
                .search_provider(ProviderConfig::new("serper", 2), true, serper.clone())
                .search_provider(ProviderConfig::new("duckduckgo", 4), true, duckduckgo.clone())
                .extractor(ProviderConfig::new("jina", 1), true, jina.clone())
                .build(),
        );

        Self {
            gemini,
            openai,
            serper,
            duckduckgo,
            jina,
            app: build_app(coordinator.clone()),
            coordinator,
        }
    }

    /// Send a request and decode the JSON response body.
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body)).await
    }
}
