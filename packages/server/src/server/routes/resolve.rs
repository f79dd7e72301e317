//! Resolution endpoints.
//!
//! Each handler validates nothing itself; the coordinator rejects bad input
//! with `InvalidRequest`, which maps to 400.

use axum::{extract::Extension, Json};
use provider_fallback::{ExtractedContent, GeneratedText, SearchHit, TextRequest};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::server::app::AppState;

fn default_max_tokens() -> u32 {
    1000
}

fn default_max_results() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    prompt: String,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    system: Option<String>,
}

/// POST /resolve/text
pub async fn text_handler(
    Extension(state): Extension<AppState>,
    Json(body): Json<TextBody>,
) -> Result<Json<GeneratedText>, ApiError> {
    let mut request = TextRequest::new(body.prompt, body.max_tokens);
    if let Some(system) = body.system {
        request = request.with_system(system);
    }
    let text = state.coordinator.resolve_text_request(&request).await?;
    Ok(Json(text))
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    query: String,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

#[derive(Serialize)]
pub struct SearchResponse {
    results: Vec<SearchHit>,
}

/// POST /resolve/search
pub async fn search_handler(
    Extension(state): Extension<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, ApiError> {
    let results = state
        .coordinator
        .resolve_search(&body.query, body.max_results)
        .await?;
    Ok(Json(SearchResponse { results }))
}

#[derive(Debug, Deserialize)]
pub struct ExtractBody {
    url: String,
}

/// POST /resolve/extract
pub async fn extract_handler(
    Extension(state): Extension<AppState>,
    Json(body): Json<ExtractBody>,
) -> Result<Json<ExtractedContent>, ApiError> {
    let content = state.coordinator.resolve_extraction(&body.url).await?;
    Ok(Json(content))
}

#[derive(Debug, Deserialize)]
pub struct ExtractBatchBody {
    urls: Vec<String>,
}

/// One entry of a batch; exactly one of `content` and `error` is set.
#[derive(Serialize)]
pub struct BatchItem {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<ExtractedContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// POST /resolve/extract/batch
///
/// Failures are reported per URL in input order with a 200. Only a batch
/// over the size limit fails as a whole, with 400.
pub async fn extract_batch_handler(
    Extension(state): Extension<AppState>,
    Json(body): Json<ExtractBatchBody>,
) -> Result<Json<Vec<BatchItem>>, ApiError> {
    let items = state
        .coordinator
        .resolve_extractions(&body.urls)
        .await?
        .into_iter()
        .map(|(url, outcome)| match outcome {
            Ok(content) => BatchItem {
                url,
                content: Some(content),
                error: None,
            },
            Err(err) => BatchItem {
                url,
                content: None,
                error: Some(err.to_string()),
            },
        })
        .collect();
    Ok(Json(items))
}
