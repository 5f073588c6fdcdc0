use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::api::AppState;

/// GET /metrics (Admin)
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Response {
    state.prometheus_handle.as_ref().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Metrics not enabled or failed to initialize",
            )
                .into_response()
        },
        |handle| handle.render().into_response(),
    )
}

/// The outermost request span, reachable from inner middleware.
#[derive(Clone)]
pub struct RequestSpan(pub tracing::Span);

/// Reset tokens travel in the path and must not reach logs or metric labels.
fn redact_path(path: &str) -> String {
    const RESET_PREFIX: &str = "/api/auth/reset/";
    if path.starts_with(RESET_PREFIX) && path.len() > RESET_PREFIX.len() {
        format!("{RESET_PREFIX}{{token}}")
    } else {
        path.to_string()
    }
}

const fn outcome_for(status: u16) -> &'static str {
    if status >= 500 {
        "error"
    } else if status >= 400 {
        "client_error"
    } else {
        "success"
    }
}

/// Wraps each request in a `request` span, emits one finished-request event
/// and records the HTTP metrics. `user_id` is filled in by the auth layer.
pub async fn logging_middleware(mut req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = redact_path(req.uri().path());

    let matched_path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string());

    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %uri,
        route = matched_path.clone(),
        user_id = tracing::field::Empty,
    );

    // Inner layers open their own spans; the auth layer finds this one here.
    req.extensions_mut().insert(RequestSpan(span.clone()));

    async move {
        let mut response = next.run(req).await;

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = response.status().as_u16();
        let outcome = outcome_for(status);

        let metrics_path = matched_path.as_deref().unwrap_or(&uri);

        let labels = [
            ("method", method.clone()),
            ("path", metrics_path.to_string()),
            ("status", status.to_string()),
        ];

        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_request_duration_seconds", &labels)
            .record(start.elapsed().as_secs_f64());

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        if status >= 500 {
            warn!(
                event = "http_request_finished",
                duration_ms,
                status_code = status,
                user_agent = %user_agent,
                outcome,
                "Request failed"
            );
        } else {
            info!(
                event = "http_request_finished",
                duration_ms,
                status_code = status,
                user_agent = %user_agent,
                outcome,
                "Request finished"
            );
        }

        response
    }
    .instrument(span)
    .await
}

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    headers.insert("cache-control", HeaderValue::from_static("no-store"));

    response
}

#[cfg(test)]
mod tests {
    use super::{outcome_for, redact_path};

    #[test]
    fn reset_tokens_are_redacted() {
        assert_eq!(
            redact_path("/api/auth/reset/abcdef0123"),
            "/api/auth/reset/{token}"
        );
        assert_eq!(redact_path("/api/auth/reset-request"), "/api/auth/reset-request");
        assert_eq!(redact_path("/api/users/4"), "/api/users/4");
    }

    #[test]
    fn outcome_buckets() {
        assert_eq!(outcome_for(200), "success");
        assert_eq!(outcome_for(302), "success");
        assert_eq!(outcome_for(401), "client_error");
        assert_eq!(outcome_for(503), "error");
    }
}
