//! Request metrics middleware
//!
//! Tracks request counts, latency and status codes per endpoint.

use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Metric key shared by every request that matched no route
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Record one entry per request in `AppState::endpoint_stats`
///
/// Keys are route templates, so the key set is bounded by the router.
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());

    let response = next.run(request).await;

    let latency_us = start.elapsed().as_micros() as u64;
    state
        .record_request(endpoint, response.status().as_u16(), latency_us)
        .await;

    response
}

/// Collapse path segments that identify a single resource
///
/// IDs become `:id` and the segment after `resetPassword` becomes `:token`,
/// so raw reset tokens never end up in request spans.
pub fn normalize_endpoint(path: &str) -> String {
    let mut previous = "";
    path.split('/')
        .map(|seg| {
            let normalized = if previous == "resetPassword" && !seg.is_empty() {
                ":token".to_string()
            } else if is_uuid(seg) || is_numeric(seg) {
                ":id".to_string()
            } else {
                seg.to_string()
            };
            previous = seg;
            normalized
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36
        && s.chars().enumerate().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::LogMailer;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use exploria_core::AppConfig;
    use exploria_store::InMemoryAccountRepository;
    use tower::ServiceExt;

    fn state() -> Arc<AppState> {
        let mut config = AppConfig::default();
        config.auth.argon2_memory_kib = 1024;
        config.auth.argon2_iterations = 1;
        Arc::new(
            AppState::new(
                config,
                Arc::new(InMemoryAccountRepository::new()),
                Arc::new(LogMailer),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_unmatched_paths_share_one_key() {
        let state = state();
        let app = Router::new()
            .route("/items/:id", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                metrics_middleware,
            ))
            .with_state(state.clone());

        for path in ["/x1", "/x2", "/nope/abc", "/items/1", "/items/2"] {
            let request = axum::http::Request::builder()
                .uri(path)
                .body(Body::empty())
                .unwrap();
            app.clone().oneshot(request).await.unwrap();
        }

        let stats = state.endpoint_stats.read().await;
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[UNMATCHED_ENDPOINT].count, 3);
        assert_eq!(stats[UNMATCHED_ENDPOINT].statuses[&StatusCode::NOT_FOUND.as_u16()], 3);
        assert_eq!(stats["/items/:id"].count, 2);
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("/api/v1/users/550e8400-e29b-41d4-a716-446655440000"),
            "/api/v1/users/:id"
        );
        assert_eq!(normalize_endpoint("/api/v1/users/42"), "/api/v1/users/:id");
        assert_eq!(normalize_endpoint("/api/v1/users/login"), "/api/v1/users/login");
        assert_eq!(normalize_endpoint("/health"), "/health");
    }

    #[test]
    fn test_reset_token_is_masked() {
        assert_eq!(
            normalize_endpoint("/api/v1/users/resetPassword/q2Vx-_abc123"),
            "/api/v1/users/resetPassword/:token"
        );
        assert_eq!(
            normalize_endpoint("/api/v1/users/resetPassword/"),
            "/api/v1/users/resetPassword/"
        );
    }

    #[test]
    fn test_is_uuid() {
        assert!(is_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_uuid("not-a-uuid"));
        assert!(!is_uuid("123"));
    }
}
