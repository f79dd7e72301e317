//! Integration tests for fallback resolution.
//!
//! These run the coordinator against scripted mock adapters:
//! 1. Sequential chains (text, extraction)
//! 2. Circuit breaker and rate limits
//! 3. Cache TTL
//! 4. Parallel search merge and deadlines

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use provider_fallback::{
    testing::{ManualClock, MockExtractor, MockSearcher, MockTextGenerator},
    AttemptOutcome, BreakerPolicy, CacheConfig, Capability, CoordinatorConfig, DisableReason,
    FallbackCoordinator, FallbackError, ProviderConfig, ProviderError,
};

fn transport(message: &str) -> ProviderError {
    ProviderError::Transport(message.to_string())
}

/// Text coordinator with providers registered at priorities 1, 2, 3...
fn text_coordinator(
    providers: &[Arc<MockTextGenerator>],
    clock: Arc<ManualClock>,
    policy: BreakerPolicy,
) -> FallbackCoordinator {
    let mut builder = FallbackCoordinator::builder().clock(clock).breaker_policy(policy);
    for (index, provider) in providers.iter().enumerate() {
        let id = format!("{}", (b'a' + index as u8) as char);
        builder = builder.text_provider(ProviderConfig::new(id, index as u32 + 1), true, provider.clone());
    }
    builder.build()
}

fn error_count(coordinator: &FallbackCoordinator, id: &str) -> u32 {
    coordinator
        .text_chain()
        .registry()
        .get(id)
        .map(|state| state.error_count)
        .unwrap_or_default()
}

// ============================================================================
// Sequential resolution
// ============================================================================

#[tokio::test]
async fn test_first_success_stops_the_chain() {
    let a = Arc::new(MockTextGenerator::new("a").failing(transport("down")));
    let b = Arc::new(MockTextGenerator::new("b").with_text("result-B"));
    let c = Arc::new(MockTextGenerator::new("c"));
    let coordinator = text_coordinator(
        &[a.clone(), b.clone(), c.clone()],
        Arc::new(ManualClock::new()),
        BreakerPolicy::default(),
    );

    let text = coordinator.resolve_text("coffee market", 100).await.unwrap();

    assert_eq!(text.text, "result-B");
    assert_eq!(a.call_count(), 1);
    assert_eq!(b.call_count(), 1);
    assert_eq!(c.call_count(), 0);
    assert_eq!(error_count(&coordinator, "a"), 1);
}

#[tokio::test]
async fn test_all_providers_failed_attempts_each_once() {
    let providers: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|id| Arc::new(MockTextGenerator::new(id).failing(transport("down"))))
        .collect();
    let coordinator = text_coordinator(
        &providers,
        Arc::new(ManualClock::new()),
        BreakerPolicy::default(),
    );

    let err = coordinator.resolve_text("coffee market", 100).await.unwrap_err();

    match err {
        FallbackError::AllProvidersFailed {
            capability,
            attempts,
        } => {
            assert_eq!(capability, Capability::Text);
            let order: Vec<&str> = attempts.iter().map(|a| a.provider.as_str()).collect();
            assert_eq!(order, vec!["a", "b", "c"]);
            assert!(attempts.iter().all(|a| a.was_invoked()));
        }
        other => panic!("expected AllProvidersFailed, got {:?}", other),
    }
    for provider in &providers {
        assert_eq!(provider.call_count(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_provider_falls_through() {
    let a = Arc::new(MockTextGenerator::new("a").with_delay(Duration::from_secs(120)));
    let b = Arc::new(MockTextGenerator::new("b").with_text("result-B"));
    let coordinator = FallbackCoordinator::builder()
        .clock(Arc::new(ManualClock::new()))
        .config(CoordinatorConfig::default().with_request_timeout(Duration::from_secs(5)))
        .text_provider(ProviderConfig::new("a", 1), true, a.clone())
        .text_provider(ProviderConfig::new("b", 2), true, b.clone())
        .build();

    let text = coordinator.resolve_text("coffee market", 100).await.unwrap();

    assert_eq!(text.text, "result-B");
    assert_eq!(error_count(&coordinator, "a"), 1);
    let state = coordinator.text_chain().registry().get("a").unwrap();
    assert!(state.last_error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_empty_result_is_a_failure_and_not_cached() {
    let a = Arc::new(MockTextGenerator::new("a").empty());
    let coordinator = text_coordinator(
        &[a.clone()],
        Arc::new(ManualClock::new()),
        BreakerPolicy::default(),
    );

    assert!(coordinator.resolve_text("coffee", 100).await.is_err());
    assert!(coordinator.resolve_text("coffee", 100).await.is_err());

    assert_eq!(a.call_count(), 2);
    assert_eq!(error_count(&coordinator, "a"), 2);
}

#[tokio::test]
async fn test_invalid_requests_touch_no_provider() {
    let a = Arc::new(MockTextGenerator::new("a"));
    let searcher = Arc::new(MockSearcher::new("s"));
    let extractor = Arc::new(MockExtractor::new("x"));
    let coordinator = FallbackCoordinator::builder()
        .text_provider(ProviderConfig::new("a", 1), true, a.clone())
        .search_provider(ProviderConfig::new("s", 1), true, searcher.clone())
        .extractor(ProviderConfig::new("x", 1), true, extractor.clone())
        .build();

    for result in [
        coordinator.resolve_text("   ", 100).await.map(|_| ()),
        coordinator.resolve_text("coffee", 0).await.map(|_| ()),
        coordinator.resolve_search("", 10).await.map(|_| ()),
        coordinator.resolve_search("coffee", 0).await.map(|_| ()),
        coordinator.resolve_extraction("ftp://files.example.com/a").await.map(|_| ()),
        coordinator.resolve_extraction("not a url").await.map(|_| ()),
    ] {
        assert!(matches!(result, Err(FallbackError::InvalidRequest(_))));
    }

    assert_eq!(a.call_count(), 0);
    assert_eq!(searcher.call_count(), 0);
    assert_eq!(extractor.call_count(), 0);
}

// ============================================================================
// Circuit breaker
// ============================================================================

#[tokio::test]
async fn test_threshold_disables_then_cooldown_reenables() {
    let clock = Arc::new(ManualClock::new());
    let a = Arc::new(MockTextGenerator::new("a").failing(transport("503")));
    let b = Arc::new(MockTextGenerator::new("b"));
    let coordinator = text_coordinator(&[a.clone(), b.clone()], clock.clone(), BreakerPolicy::default());

    for i in 0..5 {
        coordinator.resolve_text(&format!("prompt {}", i), 100).await.unwrap();
    }
    let state = coordinator.text_chain().registry().get("a").unwrap();
    assert!(!state.enabled);
    assert_eq!(state.error_count, 5);
    assert_eq!(state.disable_reason, Some(DisableReason::ErrorThreshold));

    coordinator.resolve_text("prompt 5", 100).await.unwrap();
    assert_eq!(a.call_count(), 5);

    a.recover();
    clock.advance(TimeDelta::seconds(3601));
    let text = coordinator.resolve_text("prompt 6", 100).await.unwrap();

    assert_eq!(text.provider, "a");
    assert_eq!(a.call_count(), 6);
    let state = coordinator.text_chain().registry().get("a").unwrap();
    assert!(state.enabled);
    assert_eq!(state.error_count, 0);
}

#[tokio::test]
async fn test_all_disabled_auto_resets() {
    let a = Arc::new(MockTextGenerator::new("a").failing(transport("down")));
    let b = Arc::new(MockTextGenerator::new("b").failing(transport("down")));
    let coordinator = text_coordinator(
        &[a.clone(), b.clone()],
        Arc::new(ManualClock::new()),
        BreakerPolicy::default().with_error_threshold(1),
    );

    assert!(coordinator.resolve_text("first", 100).await.is_err());
    assert!(coordinator
        .text_chain()
        .registry()
        .snapshot()
        .iter()
        .all(|s| !s.enabled));

    a.recover();
    let text = coordinator.resolve_text("second", 100).await.unwrap();
    assert_eq!(text.provider, "a");
}

#[tokio::test]
async fn test_config_failure_survives_auto_reset() {
    let a = Arc::new(MockTextGenerator::new("a").failing(ProviderError::Config("bad key".into())));
    let b = Arc::new(MockTextGenerator::new("b").failing(transport("down")));
    let coordinator = text_coordinator(
        &[a.clone(), b.clone()],
        Arc::new(ManualClock::new()),
        BreakerPolicy::default().with_error_threshold(1),
    );

    assert!(coordinator.resolve_text("first", 100).await.is_err());

    b.recover();
    let text = coordinator.resolve_text("second", 100).await.unwrap();
    assert_eq!(text.provider, "b");
    assert_eq!(a.call_count(), 1);

    assert!(coordinator.reset_provider_errors(Some("a")));
    assert!(!coordinator.reset_provider_errors(Some("missing")));
    assert!(coordinator.text_chain().registry().get("a").unwrap().enabled);
}

#[tokio::test]
async fn test_quota_failure_disables_for_quota_cooldown() {
    let clock = Arc::new(ManualClock::new());
    let a = Arc::new(MockTextGenerator::new("a").failing(ProviderError::QuotaExceeded("429".into())));
    let b = Arc::new(MockTextGenerator::new("b"));
    let coordinator = text_coordinator(&[a.clone(), b.clone()], clock.clone(), BreakerPolicy::default());

    coordinator.resolve_text("first", 100).await.unwrap();
    let state = coordinator.text_chain().registry().get("a").unwrap();
    assert_eq!(state.disable_reason, Some(DisableReason::Quota));

    a.recover();
    clock.advance(TimeDelta::hours(2));
    coordinator.resolve_text("second", 100).await.unwrap();
    assert_eq!(a.call_count(), 1);

    clock.advance(TimeDelta::hours(23));
    let text = coordinator.resolve_text("third", 100).await.unwrap();
    assert_eq!(text.provider, "a");
}

// ============================================================================
// Rate limits
// ============================================================================

#[tokio::test]
async fn test_rate_limited_provider_is_skipped_without_penalty() {
    let a = Arc::new(MockTextGenerator::new("a"));
    let b = Arc::new(MockTextGenerator::new("b"));
    let coordinator = FallbackCoordinator::builder()
        .clock(Arc::new(ManualClock::new()))
        .text_provider(ProviderConfig::new("a", 1).with_rate_limit(2), true, a.clone())
        .text_provider(ProviderConfig::new("b", 2), true, b.clone())
        .build();

    for i in 0..2 {
        let text = coordinator.resolve_text(&format!("prompt {}", i), 100).await.unwrap();
        assert_eq!(text.provider, "a");
    }
    let text = coordinator.resolve_text("prompt 2", 100).await.unwrap();

    assert_eq!(text.provider, "b");
    assert_eq!(a.call_count(), 2);
    assert_eq!(error_count(&coordinator, "a"), 0);

    let status = coordinator.provider_status();
    let a_status = &status[&Capability::Text]["a"];
    assert!(a_status.rate_limited);
    assert_eq!(a_status.requests_in_window, 2);
    assert_eq!(a_status.rate_limit, Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_searches_share_one_rate_limit_slot() {
    let slow = Arc::new(
        MockSearcher::new("slow")
            .with_hits(&["https://a.com/"])
            .with_delay(Duration::from_secs(5)),
    );
    let limited = Arc::new(MockSearcher::new("limited").with_hits(&["https://b.com/"]));
    let coordinator = FallbackCoordinator::builder()
        .clock(Arc::new(ManualClock::new()))
        .config(CoordinatorConfig::default().with_search_concurrency(1))
        .search_provider(ProviderConfig::new("slow", 1), true, slow)
        .search_provider(
            ProviderConfig::new("limited", 2).with_rate_limit(1),
            true,
            limited.clone(),
        )
        .build();

    let (first, second) = tokio::join!(
        coordinator.resolve_search("coffee prices", 10),
        coordinator.resolve_search("coffee exports", 10),
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(limited.call_count(), 1);
    let status = coordinator.provider_status();
    let limited_status = &status[&Capability::Search]["limited"];
    assert_eq!(limited_status.requests_in_window, 1);
    assert_eq!(limited_status.error_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_text_requests_respect_rate_limit() {
    let a = Arc::new(MockTextGenerator::new("a").with_delay(Duration::from_secs(2)));
    let b = Arc::new(MockTextGenerator::new("b"));
    let coordinator = FallbackCoordinator::builder()
        .clock(Arc::new(ManualClock::new()))
        .text_provider(ProviderConfig::new("a", 1).with_rate_limit(1), true, a.clone())
        .text_provider(ProviderConfig::new("b", 2), true, b.clone())
        .build();

    let (first, second) = tokio::join!(
        coordinator.resolve_text("first prompt", 100),
        coordinator.resolve_text("second prompt", 100),
    );

    let mut providers = vec![first.unwrap().provider, second.unwrap().provider];
    providers.sort();
    assert_eq!(providers, vec!["a", "b"]);
    assert_eq!(a.call_count(), 1);
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_identical_requests_hit_the_cache() {
    let a = Arc::new(MockTextGenerator::new("a"));
    let coordinator = text_coordinator(
        &[a.clone()],
        Arc::new(ManualClock::new()),
        BreakerPolicy::default(),
    );

    let first = coordinator.resolve_text("coffee market", 100).await.unwrap();
    let second = coordinator.resolve_text("  coffee market ", 100).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(a.call_count(), 1);
}

#[tokio::test]
async fn test_cache_ttl_expiry_triggers_fresh_call() {
    let clock = Arc::new(ManualClock::new());
    let a = Arc::new(MockTextGenerator::new("a").with_text("X"));
    let coordinator = FallbackCoordinator::builder()
        .clock(clock.clone())
        .cache_config(CacheConfig::default().with_ttl(Duration::from_secs(3600)))
        .text_provider(ProviderConfig::new("a", 1), true, a.clone())
        .build();

    assert_eq!(coordinator.resolve_text("prompt", 100).await.unwrap().text, "X");

    clock.advance(TimeDelta::seconds(3000));
    assert_eq!(coordinator.resolve_text("prompt", 100).await.unwrap().text, "X");
    assert_eq!(a.call_count(), 1);

    clock.advance(TimeDelta::seconds(700));
    assert_eq!(coordinator.resolve_text("prompt", 100).await.unwrap().text, "X");
    assert_eq!(a.call_count(), 2);
}

#[tokio::test]
async fn test_clear_cache_forces_new_call() {
    let a = Arc::new(MockTextGenerator::new("a"));
    let coordinator = text_coordinator(
        &[a.clone()],
        Arc::new(ManualClock::new()),
        BreakerPolicy::default(),
    );

    coordinator.resolve_text("prompt", 100).await.unwrap();
    assert_eq!(coordinator.clear_cache().await, 1);
    coordinator.resolve_text("prompt", 100).await.unwrap();
    assert_eq!(a.call_count(), 2);
}

// ============================================================================
// Parallel search
// ============================================================================

#[tokio::test]
async fn test_search_merges_and_dedups_across_providers() {
    let first = Arc::new(MockSearcher::new("p1").with_hits(&["https://a.com/", "https://b.com/"]));
    let second = Arc::new(MockSearcher::new("p2").with_hits(&["https://b.com/", "https://c.com/"]));
    let coordinator = FallbackCoordinator::builder()
        .search_provider(ProviderConfig::new("p1", 1), true, first.clone())
        .search_provider(ProviderConfig::new("p2", 2), true, second.clone())
        .build();

    let hits = coordinator.resolve_search("café especial", 10).await.unwrap();

    let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
    assert_eq!(urls, vec!["https://a.com/", "https://b.com/", "https://c.com/"]);
    assert_eq!(first.call_count(), 1);
    assert_eq!(second.call_count(), 1);
}

#[tokio::test]
async fn test_search_partial_success() {
    let ok = Arc::new(MockSearcher::new("serper").with_hits(&["https://a.com/"]));
    let broken = Arc::new(MockSearcher::new("bing").failing(transport("captcha")));
    let coordinator = FallbackCoordinator::builder()
        .search_provider(ProviderConfig::new("serper", 2), true, ok)
        .search_provider(ProviderConfig::new("bing", 3), true, broken)
        .build();

    let hits = coordinator.resolve_search("coffee", 10).await.unwrap();

    assert_eq!(hits.len(), 1);
    let bing = coordinator.search_chain().registry().get("bing").unwrap();
    assert_eq!(bing.error_count, 1);
}

#[tokio::test]
async fn test_search_total_failure() {
    let coordinator = FallbackCoordinator::builder()
        .search_provider(
            ProviderConfig::new("bing", 1),
            true,
            Arc::new(MockSearcher::new("bing").empty()),
        )
        .search_provider(
            ProviderConfig::new("duckduckgo", 2),
            true,
            Arc::new(MockSearcher::new("duckduckgo").failing(transport("blocked"))),
        )
        .build();

    match coordinator.resolve_search("coffee", 10).await {
        Err(FallbackError::AllProvidersFailed {
            capability,
            attempts,
        }) => {
            assert_eq!(capability, Capability::Search);
            assert_eq!(attempts.len(), 2);
        }
        other => panic!("expected AllProvidersFailed, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_search_deadline_keeps_completed_results() {
    let fast = Arc::new(MockSearcher::new("fast").with_hits(&["https://a.com/"]));
    let slow = Arc::new(
        MockSearcher::new("slow")
            .with_hits(&["https://b.com/"])
            .with_delay(Duration::from_secs(120)),
    );
    let coordinator = FallbackCoordinator::builder()
        .config(
            CoordinatorConfig::default()
                .with_request_timeout(Duration::from_secs(300))
                .with_search_deadline(Duration::from_secs(10)),
        )
        .search_provider(ProviderConfig::new("fast", 1), true, fast)
        .search_provider(ProviderConfig::new("slow", 2), true, slow)
        .build();

    let hits = coordinator.resolve_search("coffee", 10).await.unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, "https://a.com/");
    let slow_state = coordinator.search_chain().registry().get("slow").unwrap();
    assert_eq!(slow_state.error_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_search_providers_never_started_are_not_penalized() {
    let searchers: Vec<_> = ["p1", "p2"]
        .iter()
        .map(|id| Arc::new(MockSearcher::new(id).with_delay(Duration::from_secs(120))))
        .collect();
    let coordinator = FallbackCoordinator::builder()
        .config(
            CoordinatorConfig::default()
                .with_request_timeout(Duration::from_secs(300))
                .with_search_deadline(Duration::from_secs(10))
                .with_search_concurrency(1),
        )
        .search_provider(ProviderConfig::new("p1", 1), true, searchers[0].clone())
        .search_provider(ProviderConfig::new("p2", 2), true, searchers[1].clone())
        .build();

    let attempts = match coordinator.resolve_search("coffee", 10).await {
        Err(FallbackError::AllProvidersFailed { attempts, .. }) => attempts,
        other => panic!("expected AllProvidersFailed, got {:?}", other),
    };

    let timeouts = attempts
        .iter()
        .filter(|a| a.outcome == AttemptOutcome::Timeout)
        .count();
    let skipped = attempts.iter().filter(|a| !a.was_invoked()).count();
    assert_eq!((timeouts, skipped), (1, 1));

    let total_errors: u32 = coordinator
        .search_chain()
        .registry()
        .snapshot()
        .iter()
        .map(|s| s.error_count)
        .sum();
    assert_eq!(total_errors, 1);
}

#[tokio::test]
async fn test_search_results_are_cached() {
    let searcher = Arc::new(MockSearcher::new("serper").with_hits(&["https://a.com/"]));
    let coordinator = FallbackCoordinator::builder()
        .search_provider(ProviderConfig::new("serper", 1), true, searcher.clone())
        .build();

    coordinator.resolve_search("Café Especial", 10).await.unwrap();
    coordinator.resolve_search("café   especial", 10).await.unwrap();

    assert_eq!(searcher.call_count(), 1);
}

// ============================================================================
// Extraction
// ============================================================================

#[tokio::test]
async fn test_extraction_falls_back_between_strategies() {
    let jina = Arc::new(MockExtractor::new("jina").failing(ProviderError::QuotaExceeded("429".into())));
    let readability = Arc::new(MockExtractor::new("readability").with_text("Readable article text"));
    let coordinator = FallbackCoordinator::builder()
        .extractor(ProviderConfig::new("jina", 1), true, jina.clone())
        .extractor(ProviderConfig::new("readability", 2), true, readability.clone())
        .build();

    let content = coordinator
        .resolve_extraction("https://example.com/article")
        .await
        .unwrap();

    assert_eq!(content.strategy, "readability");
    assert_eq!(content.url, "https://example.com/article");
    assert_eq!(jina.call_count(), 1);
}

#[tokio::test]
async fn test_batch_extraction_keeps_input_order() {
    let extractor = Arc::new(MockExtractor::new("readability"));
    let coordinator = FallbackCoordinator::builder()
        .extractor(ProviderConfig::new("readability", 1), true, extractor.clone())
        .build();

    let urls = vec![
        "https://a.com/one".to_string(),
        "mailto:someone@example.com".to_string(),
        "https://b.com/two".to_string(),
    ];
    let results = coordinator.resolve_extractions(&urls).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, urls[0]);
    assert!(results[0].1.is_ok());
    assert!(matches!(results[1].1, Err(FallbackError::InvalidRequest(_))));
    assert!(results[2].1.is_ok());
    assert_eq!(extractor.call_count(), 2);
}

#[tokio::test]
async fn test_oversized_batch_is_rejected_before_any_extraction() {
    let extractor = Arc::new(MockExtractor::new("readability"));
    let coordinator = FallbackCoordinator::builder()
        .extractor(ProviderConfig::new("readability", 1), true, extractor.clone())
        .config(CoordinatorConfig::default().with_max_batch_urls(2))
        .build();

    let urls: Vec<String> = (0..3).map(|i| format!("https://a.com/{}", i)).collect();
    let err = coordinator.resolve_extractions(&urls).await.unwrap_err();

    assert!(matches!(err, FallbackError::InvalidRequest(_)));
    assert_eq!(extractor.call_count(), 0);

    let results = coordinator.resolve_extractions(&urls[..2]).await.unwrap();
    assert_eq!(results.len(), 2);
}

// ============================================================================
// Status and lifecycle
// ============================================================================

#[tokio::test]
async fn test_unconfigured_provider_is_reported_disabled() {
    let coordinator = FallbackCoordinator::builder()
        .text_provider(ProviderConfig::new("gemini", 1), false, Arc::new(MockTextGenerator::new("gemini")))
        .text_provider(ProviderConfig::new("groq", 2), true, Arc::new(MockTextGenerator::new("groq")))
        .build();

    let text = coordinator.resolve_text("prompt", 100).await.unwrap();
    assert_eq!(text.provider, "groq");

    let status = coordinator.provider_status();
    let capabilities: Vec<Capability> = status.keys().copied().collect();
    assert_eq!(
        capabilities,
        vec![Capability::Text, Capability::Search, Capability::Extraction]
    );
    assert!(!status[&Capability::Text]["gemini"].configured);
    assert!(!status[&Capability::Text]["gemini"].enabled);
}

#[tokio::test]
async fn test_shutdown_rejects_new_requests() {
    let a = Arc::new(MockTextGenerator::new("a"));
    let coordinator = text_coordinator(
        &[a.clone()],
        Arc::new(ManualClock::new()),
        BreakerPolicy::default(),
    );

    coordinator.shutdown().await;

    assert!(coordinator.is_shut_down());
    assert!(matches!(
        coordinator.resolve_text("prompt", 100).await,
        Err(FallbackError::ShutDown)
    ));
    assert_eq!(a.call_count(), 0);
}
