//! Testing utilities including mock adapters and a manual clock.
//!
//! These let applications exercise fallback behavior without network
//! calls: each mock can be scripted to succeed, fail with a chosen error,
//! return nothing, or stall, and counts how often it was called.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crate::clock::Clock;
use crate::error::{ProviderError, ProviderResult};
use crate::traits::{
    extractor::ContentExtractor, generator::TextGenerator, searcher::WebSearcher,
};
use crate::types::request::{
    ExtractedContent, GeneratedText, SearchHit, SearchRequest, TextRequest,
};

/// A clock that only moves when told to.
///
/// Starts at the Unix epoch so offsets read as plain seconds.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::at(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }

    pub fn set(&self, value: DateTime<Utc>) {
        *self.now.lock().unwrap() = value;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// What a mock does when called.
#[derive(Debug, Clone)]
enum Behavior {
    Succeed,
    Fail(ProviderError),
    Empty,
}

/// Scripted behavior shared by the mocks.
struct Script {
    id: String,
    behavior: RwLock<Behavior>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl Script {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            behavior: RwLock::new(Behavior::Succeed),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Count the call, wait out any delay, then report the scripted outcome.
    async fn run(&self) -> ProviderResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.behavior.read().unwrap().clone() {
            Behavior::Succeed => Ok(true),
            Behavior::Empty => Ok(false),
            Behavior::Fail(error) => Err(error),
        }
    }

    fn set(&self, behavior: Behavior) {
        *self.behavior.write().unwrap() = behavior;
    }
}

macro_rules! scripted {
    ($mock:ty) => {
        impl $mock {
            /// Fail every call with `error`.
            pub fn failing(self, error: ProviderError) -> Self {
                self.script.set(Behavior::Fail(error));
                self
            }

            /// Return an empty payload on every call.
            pub fn empty(self) -> Self {
                self.script.set(Behavior::Empty);
                self
            }

            /// Sleep before answering. Pair with a paused tokio clock.
            pub fn with_delay(mut self, delay: Duration) -> Self {
                self.script.delay = Some(delay);
                self
            }

            /// Switch to failing with `error` from now on.
            pub fn fail_with(&self, error: ProviderError) {
                self.script.set(Behavior::Fail(error));
            }

            /// Switch back to succeeding.
            pub fn recover(&self) {
                self.script.set(Behavior::Succeed);
            }

            /// Number of times the adapter was invoked.
            pub fn call_count(&self) -> usize {
                self.script.calls.load(Ordering::SeqCst)
            }
        }
    };
}

/// A mock text generator.
pub struct MockTextGenerator {
    script: Script,
    text: String,
}

impl MockTextGenerator {
    /// Succeeds with `"text from <id>"` until scripted otherwise.
    pub fn new(id: &str) -> Self {
        Self {
            script: Script::new(id),
            text: format!("text from {}", id),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

scripted!(MockTextGenerator);

#[async_trait]
impl TextGenerator for MockTextGenerator {
    fn id(&self) -> &str {
        &self.script.id
    }

    async fn generate(&self, _request: &TextRequest) -> ProviderResult<GeneratedText> {
        let text = if self.script.run().await? {
            self.text.clone()
        } else {
            String::new()
        };
        Ok(GeneratedText {
            text,
            provider: self.script.id.clone(),
        })
    }
}

/// A mock search engine.
pub struct MockSearcher {
    script: Script,
    urls: Vec<String>,
}

impl MockSearcher {
    /// Succeeds with one hit, `https://<id>.example.com/`, until scripted otherwise.
    pub fn new(id: &str) -> Self {
        Self {
            script: Script::new(id),
            urls: vec![format!("https://{}.example.com/", id)],
        }
    }

    /// Return one hit per url, ranked in the given order.
    pub fn with_hits(mut self, urls: &[&str]) -> Self {
        self.urls = urls.iter().map(|u| u.to_string()).collect();
        self
    }
}

scripted!(MockSearcher);

#[async_trait]
impl WebSearcher for MockSearcher {
    fn id(&self) -> &str {
        &self.script.id
    }

    async fn search(&self, request: &SearchRequest) -> ProviderResult<Vec<SearchHit>> {
        if !self.script.run().await? {
            return Ok(Vec::new());
        }
        Ok(self
            .urls
            .iter()
            .take(request.max_results)
            .enumerate()
            .map(|(index, url)| {
                SearchHit::new(
                    format!("Result for {}", url),
                    url.as_str(),
                    format!("{} snippet", request.query),
                    self.script.id.as_str(),
                    index + 1,
                )
            })
            .collect())
    }
}

/// A mock content extractor.
pub struct MockExtractor {
    script: Script,
    text: String,
}

impl MockExtractor {
    /// Succeeds with `"content from <id>"` until scripted otherwise.
    pub fn new(id: &str) -> Self {
        Self {
            script: Script::new(id),
            text: format!("content from {}", id),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

scripted!(MockExtractor);

#[async_trait]
impl ContentExtractor for MockExtractor {
    fn id(&self) -> &str {
        &self.script.id
    }

    async fn extract(&self, url: &str) -> ProviderResult<ExtractedContent> {
        let text = if self.script.run().await? {
            self.text.clone()
        } else {
            String::new()
        };
        Ok(ExtractedContent {
            url: url.to_string(),
            text,
            strategy: self.script.id.clone(),
        })
    }
}
