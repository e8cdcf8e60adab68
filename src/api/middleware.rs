//! Rate-limit middleware
//!
//! Applies the sliding-window limiter to every request, keyed by client
//! address, and reports the decision in `x-ratelimit-*` headers.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::handlers::AppState;
use crate::models::ErrorResponse;
use crate::rate_limit::RateLimitDecision;

/// Identity used when no client address can be determined.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Rate-limits the request by client address before passing it on.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let identity = client_identity(&request);
    let decision = state
        .limiter
        .check(&identity, state.policy.limit, state.policy.window_seconds)
        .await;

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::new("Too many requests")),
        )
            .into_response()
    };

    write_headers(response.headers_mut(), state.policy.limit, &decision);
    response
}

/// First `x-forwarded-for` hop, else the peer address, else [`ANONYMOUS_CLIENT`].
fn client_identity(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}

fn write_headers(headers: &mut HeaderMap, limit: u32, decision: &RateLimitDecision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_at_ms));
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_identity_prefers_forwarded_for() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identity(&request), "203.0.113.7");
    }

    #[test]
    fn test_identity_uses_peer_address() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        let addr: SocketAddr = "198.51.100.4:5555".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_identity(&request), "198.51.100.4");
    }

    #[test]
    fn test_identity_falls_back_to_anonymous() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_identity(&request), ANONYMOUS_CLIENT);
    }

    #[test]
    fn test_headers_written() {
        let mut headers = HeaderMap::new();
        let decision = RateLimitDecision {
            allowed: true,
            remaining: 4,
            reset_at_ms: 1_700_000_000_000,
        };
        write_headers(&mut headers, 5, &decision);

        assert_eq!(headers["x-ratelimit-limit"], "5");
        assert_eq!(headers["x-ratelimit-remaining"], "4");
        assert_eq!(headers["x-ratelimit-reset"], "1700000000000");
    }
}
