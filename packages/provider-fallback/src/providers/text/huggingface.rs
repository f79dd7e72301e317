//! HuggingFace Inference API with model rotation.
//!
//! Hosted models are often cold or overloaded. The adapter keeps a cursor
//! into its model list; a 503 or any per-model error advances the cursor and
//! tries the next model within the same call. Quota and credential errors
//! apply to every model and end the call immediately.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{FailureKind, ProviderError, ProviderResult};
use crate::providers::http::{api_client, send};
use crate::security::SecretString;
use crate::traits::generator::TextGenerator;
use crate::types::request::{GeneratedText, TextRequest};

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";

pub const DEFAULT_MODELS: &[&str] = &[
    "HuggingFaceH4/zephyr-7b-beta",
    "google/flan-t5-base",
    "microsoft/DialoGPT-large",
    "microsoft/DialoGPT-medium",
    "facebook/blenderbot-400M-distill",
];

pub struct HuggingFaceGenerator {
    id: String,
    api_key: SecretString,
    models: Vec<String>,
    cursor: AtomicUsize,
    base_url: String,
    client: Client,
}

impl HuggingFaceGenerator {
    pub fn new(api_key: SecretString, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            id: "huggingface".to_string(),
            api_key,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            cursor: AtomicUsize::new(0),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: api_client(timeout)?,
        })
    }

    /// Replace the model rotation. An empty list keeps the defaults.
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        if !models.is_empty() {
            self.models = models;
        }
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Model the next call will start with.
    pub fn current_model(&self) -> &str {
        &self.models[self.cursor.load(Ordering::Relaxed) % self.models.len()]
    }

    fn rotate(&self) {
        self.cursor.fetch_add(1, Ordering::Relaxed);
    }

    async fn call_model(&self, model: &str, request: &TextRequest) -> ProviderResult<String> {
        let body = json!({
            "inputs": request.prompt,
            "parameters": {
                "max_new_tokens": request.max_tokens,
                "temperature": 0.9,
                "return_full_text": false,
                "do_sample": true,
                "top_p": 0.95,
            },
            "options": {
                "wait_for_model": true,
                "use_cache": false,
            },
        });

        let response = send(
            self.client
                .post(format!("{}/{}", self.base_url, model))
                .bearer_auth(self.api_key.expose())
                .json(&body),
        )
        .await?;

        let value: Value = response.json().await?;
        parse_generated(&value, &request.prompt)
    }
}

/// Pull generated text out of an inference response, dropping an echoed prompt.
fn parse_generated(value: &Value, prompt: &str) -> ProviderResult<String> {
    let first = value
        .as_array()
        .and_then(|items| items.first())
        .ok_or_else(|| ProviderError::InvalidResponse("expected a non-empty array".into()))?;

    let raw = first
        .get("generated_text")
        .or_else(|| first.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| first.to_string());

    let text = raw
        .strip_prefix(prompt)
        .map(str::trim)
        .unwrap_or(raw.as_str())
        .trim()
        .to_string();

    if text.is_empty() {
        return Err(ProviderError::EmptyResult);
    }
    Ok(text)
}

#[async_trait]
impl TextGenerator for HuggingFaceGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, request: &TextRequest) -> ProviderResult<GeneratedText> {
        let mut last_error = ProviderError::EmptyResult;

        for _ in 0..self.models.len() {
            let model = self.current_model().to_string();
            match self.call_model(&model, request).await {
                Ok(text) => {
                    debug!(provider = %self.id, model = %model, chars = text.len(), "HuggingFace generated text");
                    return Ok(GeneratedText {
                        text,
                        provider: self.id.clone(),
                    });
                }
                Err(e) if e.kind() != FailureKind::Generic => return Err(e),
                Err(e) => {
                    warn!(provider = %self.id, model = %model, error = %e, "Model failed, rotating");
                    self.rotate();
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
