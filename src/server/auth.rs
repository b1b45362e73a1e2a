//! Bearer-token guard for protected routes

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::AppState;

/// `true` when `headers` carry `Authorization: Bearer <expected>`
///
/// Without a configured key nothing is authorized.
pub fn is_authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected.filter(|key| !key.is_empty()) else {
        return false;
    };

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| constant_time_eq(token.trim().as_bytes(), expected.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !is_authorized(request.headers(), state.api_key.as_deref()) {
        warn!("Rejected unauthorized request to {}", request.uri().path());
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            "Unauthorized",
        )
            .into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_auth(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(!is_authorized(&HeaderMap::new(), Some("secret")));
    }

    #[test]
    fn wrong_token_is_rejected() {
        assert!(!is_authorized(&with_auth("Bearer nope"), Some("secret")));
        assert!(!is_authorized(&with_auth("Basic secret"), Some("secret")));
    }

    #[test]
    fn matching_token_passes() {
        assert!(is_authorized(&with_auth("Bearer secret"), Some("secret")));
    }

    #[test]
    fn unconfigured_key_rejects_everything() {
        assert!(!is_authorized(&with_auth("Bearer "), None));
        assert!(!is_authorized(&with_auth("Bearer "), Some("")));
    }
}
