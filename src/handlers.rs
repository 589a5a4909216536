// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the ingress-guard service.
//!
//! Two modes of operation:
//!
//! 1. **External auth service**: a reverse proxy calls `POST /check` with
//!    the request's address candidates and headers, and reads the verdict
//!    from the 200 body.
//!
//! 2. **Direct guard**: requests pass through `guard`, which answers 429
//!    with `Retry-After` and a JSON error body when limited, and stamps
//!    `X-RateLimit-Remaining` on admitted requests.

use crate::config::Config;
use crate::context::RequestContext;
use crate::limiter::{AdmissionControl, Decision};
use crate::metrics::Metrics;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared application state.
pub struct AppState {
    pub guard: Arc<AdmissionControl>,
    pub metrics: Metrics,
    pub config: Config,
}

/// Error response body for the direct 429 contract.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(rename = "retryAfter")]
    pub retry_after: u64,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Admission check request (external auth-service mode).
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub remote_addr: Option<String>,
    pub path: String,
    pub method: String,
    /// Raw header map; keys matched case-insensitively
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Admission check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
}

/// Controller stats snapshot.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub active_keys: usize,
    pub total_requests: u64,
    pub suspicious_identities: usize,
    pub bot_signatures: usize,
    pub generated_at: DateTime<Utc>,
}

/// Manual block request.
#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    pub identity: String,
    pub duration_ms: u64,
}

/// Manual unblock request.
#[derive(Debug, Deserialize)]
pub struct UnblockRequest {
    pub identity: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "ingress-guard",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run the admission check for an externally described request.
///
/// Called by a reverse proxy before forwarding; always answers 200 so the
/// caller can read the verdict from the body.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> impl IntoResponse {
    debug!(
        remote_addr = ?req.remote_addr,
        path = %req.path,
        method = %req.method,
        "Processing admission check"
    );

    let ctx = RequestContext::from_header_map(req.remote_addr, req.method, req.path, &req.headers);
    let decision = state.guard.check(&ctx).await;
    state.metrics.record(&decision);

    let body = match decision {
        Decision::Allowed { remaining, .. } => CheckResponse {
            allowed: true,
            reason: None,
            retry_after_secs: None,
            remaining: Some(remaining),
        },
        Decision::Limited { reason, retry_after } => CheckResponse {
            allowed: false,
            reason: Some(reason.to_string()),
            retry_after_secs: Some(retry_after.as_secs()),
            remaining: None,
        },
    };
    (StatusCode::OK, Json(body))
}

/// Direct guard handler implementing the 429 contract.
pub async fn guard(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let ctx = context_from_request(addr, &request);
    let decision = state.guard.check(&ctx).await;
    state.metrics.record(&decision);

    match decision {
        Decision::Allowed { remaining, .. } => (
            StatusCode::OK,
            [("X-RateLimit-Remaining", remaining.to_string())],
            "OK",
        )
            .into_response(),
        Decision::Limited { reason, retry_after } => {
            let retry_secs = retry_after.as_secs().max(1);
            info!(
                reason = %reason,
                retry_after_secs = retry_secs,
                path = %request.uri().path(),
                "Request rejected"
            );
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_secs.to_string())],
                Json(ErrorResponse {
                    error: "rate_limited",
                    message: reason.to_string(),
                    retry_after: retry_secs,
                }),
            )
                .into_response()
        }
    }
}

/// Controller stats snapshot.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.guard.stats();
    Json(StatsResponse {
        active_keys: stats.active_keys,
        total_requests: stats.total_requests,
        suspicious_identities: stats.suspicious_identities,
        bot_signatures: stats.bot_signatures,
        generated_at: Utc::now(),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    if !state.config.metrics.enabled {
        return StatusCode::NOT_FOUND.into_response();
    }
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Force-block an identity for an explicit duration.
pub async fn block(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BlockRequest>,
) -> impl IntoResponse {
    state
        .guard
        .block_identity(&req.identity, std::time::Duration::from_millis(req.duration_ms));
    StatusCode::NO_CONTENT
}

/// Lift a manual block.
pub async fn unblock(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UnblockRequest>,
) -> impl IntoResponse {
    state.guard.unblock_identity(&req.identity);
    StatusCode::NO_CONTENT
}

/// Build a [`RequestContext`] from an axum request.
fn context_from_request(addr: SocketAddr, request: &Request<Body>) -> RequestContext {
    let headers = request.headers();
    let get = |name: &str| header_value(headers, name);

    RequestContext {
        remote_addr: Some(addr.ip().to_string()),
        path: request.uri().path().to_string(),
        method: request.method().to_string(),
        cf_connecting_ip: get("cf-connecting-ip"),
        real_ip: get("x-real-ip"),
        forwarded_for: get("x-forwarded-for"),
        user_agent: get("user-agent"),
        accept: get("accept"),
        accept_language: get("accept-language"),
        accept_encoding: get("accept-encoding"),
        connection: get("connection"),
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}
