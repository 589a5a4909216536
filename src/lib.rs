// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Ingress Guard
//!
//! Per-request admission control and abuse detection for content-site
//! ingress:
//!
//! - Fixed-window counting per composite key (identity + path + fingerprint)
//! - Dynamic quotas depressed by suspicion and rotation signals
//! - Known-bot signature matching with runtime learning
//! - Distributed-attack detection (per-identity suspicion escalation and
//!   per-subnet identity clustering)
//! - Escalating blocks, optional progressive delay near quota
//! - Manual block/unblock overrides and a stats snapshot

pub mod bots;
pub mod config;
pub mod context;
pub mod detector;
pub mod fingerprint;
pub mod handlers;
pub mod identity;
pub mod limiter;
pub mod metrics;

pub use config::{Config, ConfigError};
pub use context::RequestContext;
pub use limiter::{AdmissionControl, Decision, LimitReason, Stats};
