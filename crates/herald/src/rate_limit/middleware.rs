//! Axum middleware applying the issue-request limit.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use herald_common::constants::headers::{X_FORWARDED_FOR, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING};
use std::net::SocketAddr;

use super::RateLimitInfo;
use crate::routes::ApiError;
use crate::state::AppState;

/// Reject the request with 429 once the caller's window is full
pub async fn limit_issue_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let caller = caller_identity(&request, state.config.rate_limit.trust_forwarded_for);
    let info = state.rate_limiter.check(&caller);

    let mut response = match info.into_result() {
        Ok(_) => next.run(request).await,
        Err(e) => {
            let mut response = ApiError::from(e).into_response();
            let retry_secs = info.retry_after.num_seconds().max(1);
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_secs));
            response
        }
    };

    apply_headers(response.headers_mut(), &info);
    response
}

fn apply_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(info.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(info.remaining));
}

/// Network identity of the caller
///
/// The peer address, or the first `X-Forwarded-For` hop when the service is
/// configured to trust its proxy.
pub fn caller_identity(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
