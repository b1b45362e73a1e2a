//! Route handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{error, info};

use super::{AppState, RequestId};
use crate::summarizer::render_prompt;

pub const BANNER: &str = "url-digest is running";

#[derive(Debug, Deserialize)]
pub struct UrlSummaryRequest {
    pub url: String,
}

/// Handler failures rendered as plain text
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", message)).into_response()
            }
        }
    }
}

pub async fn banner() -> &'static str {
    BANNER
}

/// Reject empty and unparsable URLs
pub fn validate_url(raw: &str) -> Result<url::Url, ApiError> {
    if raw.trim().is_empty() {
        return Err(ApiError::BadRequest("URL is required".to_string()));
    }
    url::Url::parse(raw).map_err(|_| ApiError::BadRequest("Invalid URL format".to_string()))
}

pub async fn url_summary(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    payload: Result<Json<UrlSummaryRequest>, JsonRejection>,
) -> Result<String, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    validate_url(&payload.url)?;
    let url = payload.url.as_str();

    // Runs detached so a client disconnect cannot cancel it between launch and close
    let scraper = state.scraper.clone();
    let target = payload.url.clone();
    let scrape = tokio::spawn(async move { scraper.scrape(&target).await });

    let result = scrape
        .await
        .map_err(|e| {
            error!("[{}] Scrape task for {} failed: {}", request_id, url, e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(|e| {
            error!("[{}] Scrape of {} failed: {}", request_id, url, e);
            ApiError::Internal(e.to_string())
        })?;
    info!(
        "[{}] Scraped {}: title {:?}, {} chars of content",
        request_id,
        url,
        result.metadata.title,
        result.content.len()
    );

    let prompt = render_prompt(url, &result, state.max_content_chars);
    info!("[{}] Summarizing with a {} byte prompt", request_id, prompt.len());

    state.summarizer.summarize(&prompt).await.map_err(|e| {
        error!("[{}] Summarizer failed: {}", request_id, e);
        ApiError::Internal(e.to_string())
    })
}
