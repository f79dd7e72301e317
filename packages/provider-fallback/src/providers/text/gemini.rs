//! Google Gemini via the `generateContent` REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::providers::http::{api_client, send};
use crate::security::SecretString;
use crate::traits::generator::TextGenerator;
use crate::types::request::{GeneratedText, TextRequest};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Output tokens are capped to stay inside the free-tier quota.
pub const MAX_OUTPUT_TOKENS: u32 = 2048;

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub struct GeminiGenerator {
    id: String,
    api_key: SecretString,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiGenerator {
    pub fn new(api_key: SecretString, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            id: "gemini".to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: api_client(timeout)?,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: serde_json::Value,
    safety_settings: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Concatenate the text parts of the first candidate.
fn parse_response(response: GenerateResponse) -> ProviderResult<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::InvalidResponse(format!(
            "prompt blocked: {}",
            reason
        )));
    }

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResult);
    }
    Ok(text)
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, request: &TextRequest) -> ProviderResult<GeneratedText> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            system_instruction: request.system.as_deref().map(|text| Content {
                parts: vec![Part { text }],
            }),
            generation_config: json!({
                "temperature": 0.7,
                "topP": 0.95,
                "topK": 64,
                "maxOutputTokens": request.max_tokens.min(MAX_OUTPUT_TOKENS),
                "candidateCount": 1,
            }),
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| json!({ "category": category, "threshold": "BLOCK_NONE" }))
                .collect(),
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = send(
            self.client
                .post(&url)
                .header("x-goog-api-key", self.api_key.expose())
                .json(&body),
        )
        .await?;

        let parsed: GenerateResponse = response.json().await?;
        let text = parse_response(parsed)?;
        debug!(provider = %self.id, chars = text.len(), "Gemini generated text");

        Ok(GeneratedText {
            text,
            provider: self.id.clone(),
        })
    }
}
