// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Ingress Guard Service
//!
//! Admission control and abuse detection in front of a content site.
//!
//! ## Usage
//!
//! The service provides two modes of operation:
//!
//! 1. **External auth service**: Envoy or another proxy calls `/check` to
//!    vet requests before forwarding.
//!
//! 2. **Direct guard**: Requests pass through the service, which answers
//!    429 with `Retry-After` when a request is rejected.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `WINDOW_MS`: Counting window in milliseconds (default: 60000)
//! - `MAX_REQUESTS`: Base requests per window per key (default: 60)
//! - `BLOCK_DURATION_MS`: Block duration unit in milliseconds (default: 60000)
//! - `PROGRESSIVE_DELAY`: Delay requests nearing their quota (default: false)

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ingress_guard::{
    config::Config,
    handlers::{self, AppState},
    limiter::AdmissionControl,
    metrics::Metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        window_ms = config.admission.window_ms,
        max_requests = config.admission.max_requests,
        block_duration_ms = config.admission.block_duration_ms,
        progressive_delay = config.admission.progressive_delay,
        "Starting ingress guard"
    );

    // Create application state
    let guard = Arc::new(AdmissionControl::new(config.clone())?);
    guard.spawn_cleanup();

    let state = Arc::new(AppState {
        guard: guard.clone(),
        metrics: Metrics::new()?,
        config: config.clone(),
    });

    // Build router
    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/healthz", get(handlers::health))
        .route("/check", post(handlers::check))
        .route("/stats", get(handlers::stats))
        .route("/metrics", get(handlers::metrics))
        .route("/admin/block", post(handlers::block))
        .route("/admin/unblock", post(handlers::unblock))
        .fallback(handlers::guard)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    guard.shutdown();
    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    let mut config = Config::default();
    if let Ok(addr) = std::env::var("BIND_ADDR") {
        config.bind_addr = addr;
    }
    if let Some(window_ms) = env_parse("WINDOW_MS") {
        config.admission.window_ms = window_ms;
    }
    if let Some(max_requests) = env_parse("MAX_REQUESTS") {
        config.admission.max_requests = max_requests;
    }
    if let Some(block_ms) = env_parse("BLOCK_DURATION_MS") {
        config.admission.block_duration_ms = block_ms;
    }
    if let Some(enabled) = env_parse("PROGRESSIVE_DELAY") {
        config.admission.progressive_delay = enabled;
    }
    config
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}
