//! OpenAI chat completions, and any API that speaks the same protocol.
//!
//! Groq exposes an OpenAI-compatible endpoint, so one adapter serves both:
//!
//! ```rust,ignore
//! let openai = OpenAiCompatibleGenerator::openai(openai_key, timeout)?;
//! let groq = OpenAiCompatibleGenerator::groq(groq_key, timeout)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::providers::http::{api_client, send};
use crate::security::SecretString;
use crate::traits::generator::TextGenerator;
use crate::types::request::{GeneratedText, TextRequest};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub struct OpenAiCompatibleGenerator {
    id: String,
    api_key: SecretString,
    model: String,
    base_url: String,
    max_tokens_cap: Option<u32>,
    temperature: f32,
    client: Client,
}

impl OpenAiCompatibleGenerator {
    /// Generic constructor for any OpenAI-compatible endpoint.
    pub fn new(
        id: impl Into<String>,
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        Ok(Self {
            id: id.into(),
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_tokens_cap: None,
            temperature: 0.7,
            client: api_client(timeout)?,
        })
    }

    /// OpenAI, with completions capped at 1500 tokens.
    pub fn openai(api_key: SecretString, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self::new("openai", api_key, OPENAI_BASE_URL, "gpt-3.5-turbo", timeout)?
            .with_max_tokens_cap(1500))
    }

    /// Groq hosting Llama 3 70B.
    pub fn groq(api_key: SecretString, timeout: Duration) -> ProviderResult<Self> {
        Self::new("groq", api_key, GROQ_BASE_URL, "llama3-70b-8192", timeout)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens_cap(mut self, cap: u32) -> Self {
        self.max_tokens_cap = Some(cap);
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, request: &TextRequest) -> ProviderResult<GeneratedText> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let max_tokens = match self.max_tokens_cap {
            Some(cap) => request.max_tokens.min(cap),
            None => request.max_tokens,
        };

        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens,
            temperature: self.temperature,
        };

        let response = send(
            self.client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(self.api_key.expose())
                .json(&body),
        )
        .await?;

        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProviderError::EmptyResult)?;

        debug!(provider = %self.id, model = %self.model, chars = text.len(), "Chat completion received");

        Ok(GeneratedText {
            text,
            provider: self.id.clone(),
        })
    }
}
