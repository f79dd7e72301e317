//! HTTP adapter tests against a local mock server.
//!
//! Each adapter must turn status codes and payloads into the right
//! `ProviderError` class, since the circuit breaker depends on it.

use std::sync::Arc;
use std::time::Duration;

use provider_fallback::{
    providers::{
        extract::{JinaReaderExtractor, ReadabilityExtractor, SiteSpecificExtractor},
        http::PageFetcher,
        search::{DuckDuckGoSearch, GoogleCustomSearch, SearchLocale, SerperSearch},
        text::{GeminiGenerator, HuggingFaceGenerator, OpenAiCompatibleGenerator},
    },
    Capability, ContentExtractor, DisableReason, FailureKind, FallbackCoordinator, FallbackError,
    ProviderConfig, ProviderError, SearchRequest, SecretString, TextGenerator, TextRequest,
    ValidationOutcome, WebSearcher,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn key() -> SecretString {
    SecretString::new("test-key")
}

fn article_html() -> String {
    let paragraphs: String = (1..=6)
        .map(|i| {
            format!(
                "<p>Paragraph {} on the Brazilian specialty coffee market and its growth.</p>",
                i
            )
        })
        .collect();
    format!(
        "<html><body><nav>Home | News | Contact</nav><article>{}</article>\
         <footer>Copyright notice for the site</footer></body></html>",
        paragraphs
    )
}

// ============================================================================
// Text generation
// ============================================================================

async fn openai(server: &MockServer) -> OpenAiCompatibleGenerator {
    OpenAiCompatibleGenerator::openai(key(), TIMEOUT)
        .unwrap()
        .with_base_url(server.uri())
}

#[tokio::test]
async fn test_openai_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Market summary" } }]
        })))
        .mount(&server)
        .await;

    let text = openai(&server)
        .await
        .generate(&TextRequest::new("Summarize", 100))
        .await
        .unwrap();

    assert_eq!(text.text, "Market summary");
    assert_eq!(text.provider, "openai");
}

#[tokio::test]
async fn test_openai_429_is_quota() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit reached"))
        .mount(&server)
        .await;

    let err = openai(&server)
        .await
        .generate(&TextRequest::new("Summarize", 100))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Quota);
}

#[tokio::test]
async fn test_openai_401_is_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Incorrect API key"))
        .mount(&server)
        .await;

    let err = openai(&server)
        .await
        .generate(&TextRequest::new("Summarize", 100))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Config);
}

#[tokio::test]
async fn test_openai_empty_choices_is_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = openai(&server)
        .await
        .generate(&TextRequest::new("Summarize", 100))
        .await
        .unwrap_err();

    assert_eq!(err, ProviderError::EmptyResult);
}

#[tokio::test]
async fn test_gemini_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Gemini says hi" }] } }]
        })))
        .mount(&server)
        .await;

    let generator = GeminiGenerator::new(key(), TIMEOUT)
        .unwrap()
        .with_base_url(server.uri());
    let text = generator
        .generate(&TextRequest::new("Hello", 10_000))
        .await
        .unwrap();

    assert_eq!(text.text, "Gemini says hi");
}

#[tokio::test]
async fn test_huggingface_rotates_past_unavailable_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cold-model"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Model is loading"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/warm-model"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "generated_text": "Prompt text. The answer." }])),
        )
        .mount(&server)
        .await;

    let generator = HuggingFaceGenerator::new(key(), TIMEOUT)
        .unwrap()
        .with_base_url(server.uri())
        .with_models(vec!["cold-model".into(), "warm-model".into()]);

    let text = generator
        .generate(&TextRequest::new("Prompt text.", 50))
        .await
        .unwrap();

    assert_eq!(text.text, "The answer.");
    assert_eq!(generator.current_model(), "warm-model");
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_serper_parses_organic_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic": [
                { "title": "Coffee report", "link": "https://a.com/report", "snippet": "Growth" },
                { "title": "No link" },
                { "title": "Beans", "link": "https://b.com" }
            ]
        })))
        .mount(&server)
        .await;

    let serper = SerperSearch::new(key(), SearchLocale::default(), TIMEOUT)
        .unwrap()
        .with_base_url(server.uri());
    let hits = serper
        .search(&SearchRequest::new("café", 10))
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].source, "serper");
    assert_eq!(hits[1].url, "https://b.com");
    assert_eq!(hits[1].rank, 2);
}

#[tokio::test]
async fn test_google_daily_limit_is_quota() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("cx", "engine"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Daily Limit Exceeded" }
        })))
        .mount(&server)
        .await;

    let google = GoogleCustomSearch::new(key(), "engine", SearchLocale::default(), TIMEOUT)
        .unwrap()
        .with_base_url(format!("{}/customsearch/v1", server.uri()));
    let err = google
        .search(&SearchRequest::new("coffee", 10))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Quota);
}

#[tokio::test]
async fn test_duckduckgo_scrapes_result_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", "coffee"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="result"><a class="result__a" href="/l/?uddg=https%3A%2F%2Fa.com%2F">A</a>
               <a class="result__snippet">About A</a></div>"#,
        ))
        .mount(&server)
        .await;

    let fetcher = Arc::new(PageFetcher::new(TIMEOUT).unwrap());
    let ddg = DuckDuckGoSearch::new(fetcher, SearchLocale::default())
        .with_search_url(format!("{}/html/", server.uri()));
    let hits = ddg.search(&SearchRequest::new("coffee", 10)).await.unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, "https://a.com/");
}

// ============================================================================
// Extraction
// ============================================================================

#[tokio::test]
async fn test_jina_reader_returns_text() {
    let server = MockServer::start().await;
    let body = "Specialty coffee consumption in Brazil keeps growing. ".repeat(5);
    Mock::given(method("GET"))
        .and(path_regex(r"a\.com/page$"))
        .and(header("x-return-format", "text"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let jina = JinaReaderExtractor::new(key(), TIMEOUT)
        .unwrap()
        .with_base_url(server.uri());
    let content = jina.extract("https://a.com/page").await.unwrap();

    assert_eq!(content.strategy, "jina");
    assert!(content.text.starts_with("Specialty coffee"));
}

#[tokio::test]
async fn test_jina_error_body_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Error: target responded with 403 Forbidden, cannot read page content"),
        )
        .mount(&server)
        .await;

    let jina = JinaReaderExtractor::new(key(), TIMEOUT)
        .unwrap()
        .with_base_url(server.uri());
    let err = jina.extract("https://a.com/page").await.unwrap_err();

    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_local_extractors_read_fetched_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article_html()))
        .mount(&server)
        .await;

    let fetcher = Arc::new(PageFetcher::new(TIMEOUT).unwrap());
    let url = format!("{}/article", server.uri());

    let readable = ReadabilityExtractor::new(fetcher.clone())
        .extract(&url)
        .await
        .unwrap();
    assert_eq!(readable.text.lines().count(), 6);
    assert!(!readable.text.contains("Copyright"));

    let site = SiteSpecificExtractor::new(fetcher).extract(&url).await.unwrap();
    assert!(site.text.contains("Paragraph 1"));
}

#[tokio::test]
async fn test_extraction_chain_survives_reader_quota() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article_html()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/http"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
        .mount(&server)
        .await;

    let fetcher = Arc::new(PageFetcher::new(TIMEOUT).unwrap());
    let jina = JinaReaderExtractor::new(key(), TIMEOUT)
        .unwrap()
        .with_base_url(server.uri());
    let coordinator = FallbackCoordinator::builder()
        .extractor(ProviderConfig::new("jina", 1), true, Arc::new(jina))
        .extractor(
            ProviderConfig::new("readability", 2),
            true,
            Arc::new(ReadabilityExtractor::new(fetcher)),
        )
        .build();

    let content = coordinator
        .resolve_extraction(&format!("{}/article", server.uri()))
        .await
        .unwrap();

    assert_eq!(content.strategy, "readability");
    let jina_state = coordinator.extraction_chain().registry().get("jina").unwrap();
    assert!(!jina_state.enabled);
}

// ============================================================================
// Credential validation
// ============================================================================

#[tokio::test]
async fn test_validation_disables_rejected_key_up_front() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "OK" }] } }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Incorrect API key"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
        .mount(&server)
        .await;
    // The scraped engine holds no key and must not be queried.
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gemini = GeminiGenerator::new(key(), TIMEOUT)
        .unwrap()
        .with_base_url(server.uri());
    let serper = SerperSearch::new(key(), SearchLocale::default(), TIMEOUT)
        .unwrap()
        .with_base_url(server.uri());
    let fetcher = Arc::new(PageFetcher::new(TIMEOUT).unwrap());
    let ddg = DuckDuckGoSearch::new(fetcher.clone(), SearchLocale::default())
        .with_search_url(format!("{}/html/", server.uri()));

    let coordinator = FallbackCoordinator::builder()
        .text_provider(ProviderConfig::new("gemini", 1), true, Arc::new(gemini))
        .text_provider(ProviderConfig::new("openai", 2), true, Arc::new(openai(&server).await))
        .search_provider(ProviderConfig::new("serper", 2), true, Arc::new(serper))
        .search_provider(ProviderConfig::new("duckduckgo", 4), true, Arc::new(ddg))
        .extractor(
            ProviderConfig::new("readability", 2),
            true,
            Arc::new(ReadabilityExtractor::new(fetcher)),
        )
        .build();

    let report = coordinator.validate_providers().await.unwrap();

    let text = &report.providers[&Capability::Text];
    assert_eq!(text["gemini"], ValidationOutcome::Valid);
    assert!(matches!(
        &text["openai"],
        ValidationOutcome::Invalid { kind: FailureKind::Config, .. }
    ));
    let search = &report.providers[&Capability::Search];
    assert!(matches!(
        &search["serper"],
        ValidationOutcome::Invalid { kind: FailureKind::Quota, .. }
    ));
    assert_eq!(search["duckduckgo"], ValidationOutcome::Valid);
    assert!(report.is_healthy());

    let openai_state = coordinator.text_chain().registry().get("openai").unwrap();
    assert!(!openai_state.enabled);
    assert_eq!(openai_state.disable_reason, Some(DisableReason::Config));
    let serper_state = coordinator.search_chain().registry().get("serper").unwrap();
    assert_eq!(serper_state.disable_reason, Some(DisableReason::Quota));

    let text = coordinator.resolve_text("Summarize", 100).await.unwrap();
    assert_eq!(text.provider, "gemini");
    assert!(coordinator.last_validation().is_some());
}

#[tokio::test]
async fn test_validation_skips_unconfigured_providers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .expect(0)
        .mount(&server)
        .await;

    let groq = OpenAiCompatibleGenerator::groq(SecretString::new(""), TIMEOUT)
        .unwrap()
        .with_base_url(server.uri());
    let coordinator = FallbackCoordinator::builder()
        .text_provider(ProviderConfig::new("groq", 3), false, Arc::new(groq))
        .build();

    let report = coordinator.validate_providers().await.unwrap();

    assert!(matches!(
        &report.providers[&Capability::Text]["groq"],
        ValidationOutcome::Skipped { .. }
    ));
    assert!(!report.is_healthy());
    assert_eq!(coordinator.text_chain().registry().get("groq").unwrap().error_count, 0);
}

#[tokio::test]
async fn test_jina_validation_reports_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/https://example\.com"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Invalid token"))
        .mount(&server)
        .await;

    let jina = JinaReaderExtractor::new(key(), TIMEOUT)
        .unwrap()
        .with_base_url(server.uri());
    assert_eq!(jina.validate().await.unwrap_err().kind(), FailureKind::Config);

    let keyless = JinaReaderExtractor::new(SecretString::new(""), TIMEOUT)
        .unwrap()
        .with_base_url(server.uri());
    assert!(keyless.validate().await.is_ok());
}

#[tokio::test]
async fn test_validation_refused_after_shutdown() {
    let coordinator = FallbackCoordinator::builder().build();
    coordinator.shutdown().await;
    assert!(matches!(
        coordinator.validate_providers().await,
        Err(FallbackError::ShutDown)
    ));
}
