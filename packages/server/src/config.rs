use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use provider_fallback::SecretString;

/// API keys for the external providers.
///
/// A missing key leaves its provider registered but disabled.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub gemini: Option<SecretString>,
    pub openai: Option<SecretString>,
    pub groq: Option<SecretString>,
    pub huggingface: Option<SecretString>,
    pub google_search: Option<SecretString>,
    pub google_cse_id: Option<String>,
    pub serper: Option<SecretString>,
    pub jina: Option<SecretString>,
}

impl ApiKeys {
    fn from_env() -> Self {
        let secret = |name: &str| SecretString::non_empty(env::var(name).ok());
        Self {
            gemini: secret("GEMINI_API_KEY"),
            openai: secret("OPENAI_API_KEY"),
            groq: secret("GROQ_API_KEY"),
            huggingface: secret("HUGGINGFACE_API_KEY"),
            google_search: secret("GOOGLE_SEARCH_KEY"),
            google_cse_id: env::var("GOOGLE_CSE_ID")
                .ok()
                .filter(|id| !id.trim().is_empty()),
            serper: secret("SERPER_API_KEY"),
            jina: secret("JINA_API_KEY"),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    /// SQLite URL for a durable cache; in-memory when unset
    pub cache_database_url: Option<String>,
    pub request_timeout: Duration,
    pub search_deadline: Duration,
    pub search_max_concurrency: usize,
    /// Largest URL list accepted by the batch extraction route
    pub max_batch_urls: usize,
    pub error_threshold: u32,
    pub cooldown: Duration,
    pub quota_cooldown: Duration,
    /// Spacing between requests to scraped search engines
    pub search_pacing: Duration,
    pub search_country: String,
    pub search_language: String,
    /// Check every provider's credentials before serving traffic
    pub validate_on_startup: bool,
    pub keys: ApiKeys,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            cache_enabled: true,
            cache_ttl: Duration::from_secs(3600),
            cache_database_url: None,
            request_timeout: Duration::from_secs(30),
            search_deadline: Duration::from_secs(60),
            search_max_concurrency: 4,
            max_batch_urls: 50,
            error_threshold: 5,
            cooldown: Duration::from_secs(3600),
            quota_cooldown: Duration::from_secs(86_400),
            search_pacing: Duration::from_millis(1500),
            search_country: "br".to_string(),
            search_language: "pt".to_string(),
            validate_on_startup: true,
            keys: ApiKeys::default(),
        }
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value, got {:?}", name, value)),
        _ => Ok(default),
    }
}

fn seconds_var(name: &str, default: Duration) -> Result<Duration> {
    parse_var(name, default.as_secs()).map(Duration::from_secs)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = Self::default();
        Ok(Self {
            port: parse_var("PORT", defaults.port).context("PORT must be a valid number")?,
            cache_enabled: parse_var("CACHE_ENABLED", defaults.cache_enabled)?,
            cache_ttl: seconds_var("CACHE_TTL", defaults.cache_ttl)?,
            cache_database_url: env::var("CACHE_DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            request_timeout: seconds_var("REQUEST_TIMEOUT", defaults.request_timeout)?,
            search_deadline: seconds_var("SEARCH_DEADLINE", defaults.search_deadline)?,
            search_max_concurrency: parse_var(
                "SEARCH_MAX_CONCURRENCY",
                defaults.search_max_concurrency,
            )?,
            max_batch_urls: parse_var("MAX_BATCH_URLS", defaults.max_batch_urls)?,
            error_threshold: parse_var("PROVIDER_ERROR_THRESHOLD", defaults.error_threshold)?,
            cooldown: seconds_var("PROVIDER_COOLDOWN_SECS", defaults.cooldown)?,
            quota_cooldown: seconds_var("PROVIDER_QUOTA_COOLDOWN_SECS", defaults.quota_cooldown)?,
            search_pacing: parse_var("SEARCH_PACING_MS", defaults.search_pacing.as_millis() as u64)
                .map(Duration::from_millis)?,
            search_country: env::var("SEARCH_COUNTRY").unwrap_or(defaults.search_country),
            search_language: env::var("SEARCH_LANGUAGE").unwrap_or(defaults.search_language),
            validate_on_startup: parse_var(
                "VALIDATE_PROVIDERS_ON_STARTUP",
                defaults.validate_on_startup,
            )?,
            keys: ApiKeys::from_env(),
        })
    }
}
