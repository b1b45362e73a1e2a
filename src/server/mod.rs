//! HTTP front end
//!
//! `GET /` answers with a banner. `POST /url-summary` scrapes the posted URL
//! and returns a one-line summary from the configured summarizer. Every
//! response carries an `x-request-id` header; every request is logged and
//! rate limited per client.

pub mod auth;
pub mod rate_limit;
pub mod routes;

pub use rate_limit::{RateLimiter, spawn_sweeper};

use anyhow::Context;
use axum::Router;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use crate::Config;
use crate::pipeline::{PageScraper, Scraper};
use crate::summarizer::Summarizer;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Identifier assigned to each request, available to handlers as an extension
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<dyn PageScraper>,
    pub summarizer: Arc<Summarizer>,
    pub limiter: Arc<RateLimiter>,
    pub api_key: Option<Arc<str>>,
    pub max_content_chars: usize,
}

impl AppState {
    pub fn new(
        scraper: Arc<dyn PageScraper>,
        summarizer: Summarizer,
        limiter: Arc<RateLimiter>,
        api_key: Option<String>,
        max_content_chars: usize,
    ) -> Self {
        Self {
            scraper,
            summarizer: Arc::new(summarizer),
            limiter,
            api_key: api_key.map(Arc::from),
            max_content_chars,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/url-summary", post(routes::url_summary))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer));

    Router::new()
        .route("/", get(routes::banner))
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce_rate_limit,
        ))
        .layer(middleware::from_fn(log_requests))
        .layer(middleware::from_fn(assign_request_id))
        .with_state(state)
}

async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "[{}] {} {} -> {} in {:?}",
        request_id,
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    if config.server.api_key.is_none() {
        warn!("No API key configured; every /url-summary request will be rejected");
    }

    let scraper = Scraper::from_config(config)?;
    let limiter = Arc::new(RateLimiter::from_config(&config.server.rate_limit));
    let sweeper = spawn_sweeper(
        limiter.clone(),
        Duration::from_secs(config.server.rate_limit.sweep_interval_secs.max(1)),
    );

    let state = AppState::new(
        Arc::new(scraper),
        Summarizer::from_config(&config.summarizer),
        limiter,
        config.server.api_key.clone(),
        config.summarizer.max_content_chars,
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;
    info!("Listening on http://{}", listener.local_addr()?);

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await;

    sweeper.abort();
    served.context("Server error")
}
