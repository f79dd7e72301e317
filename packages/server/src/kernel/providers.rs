//! Composition root for the fallback coordinator.
//!
//! Every provider is registered even when its credential is missing, so the
//! status endpoint can show it as unconfigured instead of silently absent.
//!
//! ```text
//! text:        gemini(1) → openai(2) → groq(3) → huggingface(4)
//! search:      google(1) + serper(2) + bing(3) + duckduckgo(4)   (parallel)
//! extraction:  jina(1) → readability(2) → site_specific(3) → raw_html(4)
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use provider_fallback::providers::extract::{
    JinaReaderExtractor, RawHtmlExtractor, ReadabilityExtractor, SiteSpecificExtractor,
};
use provider_fallback::providers::http::PageFetcher;
use provider_fallback::providers::paced::Paced;
use provider_fallback::providers::search::{
    BingSearch, DuckDuckGoSearch, GoogleCustomSearch, SearchLocale, SerperSearch,
};
use provider_fallback::providers::text::{
    GeminiGenerator, HuggingFaceGenerator, OpenAiCompatibleGenerator,
};
use provider_fallback::{
    BreakerPolicy, CacheConfig, CacheStore, CoordinatorConfig, FallbackCoordinator,
    FallbackCoordinatorBuilder, MemoryCacheStore, ProviderConfig, SecretString, SqliteCacheStore,
};

use crate::config::Config;

/// Unconfigured providers still need an adapter; it is never called.
fn key_or_placeholder(key: &Option<SecretString>) -> (SecretString, bool) {
    match key {
        Some(key) => (key.clone(), true),
        None => (SecretString::new(""), false),
    }
}

/// Build the coordinator with every provider registered.
pub async fn build_coordinator(config: &Config) -> Result<FallbackCoordinator> {
    let store: Arc<dyn CacheStore> = match &config.cache_database_url {
        Some(url) => {
            tracing::info!("Using SQLite result cache");
            Arc::new(
                SqliteCacheStore::new(url)
                    .await
                    .context("Failed to open cache database")?,
            )
        }
        None => Arc::new(MemoryCacheStore::new()),
    };

    let builder = FallbackCoordinator::builder()
        .breaker_policy(
            BreakerPolicy::default()
                .with_error_threshold(config.error_threshold)
                .with_cooldown(config.cooldown)
                .with_quota_cooldown(config.quota_cooldown),
        )
        .cache_config(if config.cache_enabled {
            CacheConfig::default().with_ttl(config.cache_ttl)
        } else {
            CacheConfig::disabled()
        })
        .config(
            CoordinatorConfig::default()
                .with_request_timeout(config.request_timeout)
                .with_search_deadline(config.search_deadline)
                .with_search_concurrency(config.search_max_concurrency)
                .with_max_batch_urls(config.max_batch_urls),
        )
        .cache_store(store);

    let fetcher = Arc::new(
        PageFetcher::new(config.request_timeout).context("Failed to build page fetcher")?,
    );

    let builder = register_text(builder, config)?;
    let builder = register_search(builder, config, fetcher.clone())?;
    let builder = register_extraction(builder, config, fetcher)?;

    let coordinator = builder.build();
    for (capability, providers) in coordinator.provider_status() {
        let enabled = providers.values().filter(|status| status.enabled).count();
        tracing::info!(
            %capability,
            enabled,
            registered = providers.len(),
            "Providers registered"
        );
    }
    Ok(coordinator)
}

fn register_text(
    builder: FallbackCoordinatorBuilder,
    config: &Config,
) -> Result<FallbackCoordinatorBuilder> {
    let timeout = config.request_timeout;
    let keys = &config.keys;

    let (key, configured) = key_or_placeholder(&keys.gemini);
    let gemini = GeminiGenerator::new(key, timeout).context("Failed to build Gemini client")?;
    let builder = builder.text_provider(ProviderConfig::new("gemini", 1), configured, Arc::new(gemini));

    let (key, configured) = key_or_placeholder(&keys.openai);
    let openai =
        OpenAiCompatibleGenerator::openai(key, timeout).context("Failed to build OpenAI client")?;
    let builder = builder.text_provider(ProviderConfig::new("openai", 2), configured, Arc::new(openai));

    let (key, configured) = key_or_placeholder(&keys.groq);
    let groq = OpenAiCompatibleGenerator::groq(key, timeout).context("Failed to build Groq client")?;
    let builder = builder.text_provider(ProviderConfig::new("groq", 3), configured, Arc::new(groq));

    let (key, configured) = key_or_placeholder(&keys.huggingface);
    let huggingface = HuggingFaceGenerator::new(key, timeout)
        .context("Failed to build HuggingFace client")?;
    Ok(builder.text_provider(
        ProviderConfig::new("huggingface", 4),
        configured,
        Arc::new(huggingface),
    ))
}

fn register_search(
    builder: FallbackCoordinatorBuilder,
    config: &Config,
    fetcher: Arc<PageFetcher>,
) -> Result<FallbackCoordinatorBuilder> {
    let timeout = config.request_timeout;
    let keys = &config.keys;
    let locale = SearchLocale::new(&config.search_country, &config.search_language);

    let (key, has_key) = key_or_placeholder(&keys.google_search);
    let engine_id = keys.google_cse_id.clone().unwrap_or_default();
    let configured = has_key && !engine_id.is_empty();
    let google = GoogleCustomSearch::new(key, engine_id, locale.clone(), timeout)
        .context("Failed to build Google search client")?;
    let builder = builder.search_provider(
        ProviderConfig::new("google", 1).with_rate_limit(100),
        configured,
        Arc::new(google),
    );

    let (key, configured) = key_or_placeholder(&keys.serper);
    let serper = SerperSearch::new(key, locale.clone(), timeout)
        .context("Failed to build Serper client")?;
    let builder = builder.search_provider(
        ProviderConfig::new("serper", 2).with_rate_limit(2500),
        configured,
        Arc::new(serper),
    );

    // Scraped engines need no key but must be paced.
    let bing = Paced::new(
        BingSearch::new(fetcher.clone(), locale.clone()),
        config.search_pacing,
    );
    let duckduckgo = Paced::new(DuckDuckGoSearch::new(fetcher, locale), config.search_pacing);

    Ok(builder
        .search_provider(
            ProviderConfig::new("bing", 3).with_rate_limit(1000),
            true,
            Arc::new(bing),
        )
        .search_provider(
            ProviderConfig::new("duckduckgo", 4).with_rate_limit(500),
            true,
            Arc::new(duckduckgo),
        ))
}

fn register_extraction(
    builder: FallbackCoordinatorBuilder,
    config: &Config,
    fetcher: Arc<PageFetcher>,
) -> Result<FallbackCoordinatorBuilder> {
    let (key, configured) = key_or_placeholder(&config.keys.jina);
    let jina = JinaReaderExtractor::new(key, config.request_timeout)
        .context("Failed to build Jina reader client")?;

    Ok(builder
        .extractor(ProviderConfig::new("jina", 1), configured, Arc::new(jina))
        .extractor(
            ProviderConfig::new("readability", 2),
            true,
            Arc::new(ReadabilityExtractor::new(fetcher.clone())),
        )
        .extractor(
            ProviderConfig::new("site_specific", 3),
            true,
            Arc::new(SiteSpecificExtractor::new(fetcher.clone())),
        )
        .extractor(
            ProviderConfig::new("raw_html", 4),
            true,
            Arc::new(RawHtmlExtractor::new(fetcher)),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider_fallback::Capability;

    #[tokio::test]
    async fn test_missing_keys_register_disabled_providers() {
        let config = Config::default();
        let coordinator = build_coordinator(&config).await.unwrap();
        let status = coordinator.provider_status();

        let text = &status[&Capability::Text];
        assert_eq!(text.len(), 4);
        assert!(text.values().all(|s| !s.configured && !s.enabled));

        let search = &status[&Capability::Search];
        assert!(!search["google"].configured);
        assert!(search["bing"].enabled);
        assert_eq!(search["duckduckgo"].rate_limit, Some(500));

        let extraction = &status[&Capability::Extraction];
        assert!(!extraction["jina"].enabled);
        assert!(extraction["raw_html"].enabled);
    }

    #[tokio::test]
    async fn test_google_needs_engine_id() {
        let mut config = Config::default();
        config.keys.google_search = Some(SecretString::new("key"));
        let coordinator = build_coordinator(&config).await.unwrap();

        let status = coordinator.provider_status();
        assert!(!status[&Capability::Search]["google"].configured);
    }
}
