// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for admission decisions.
//!
//! Counters are recorded by the HTTP layer after a decision is made; the
//! decision path itself never consults them.

use crate::limiter::{Decision, LimitReason};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Decision counters behind a private registry (one per service instance,
/// so independently configured limiters do not collide on metric names).
pub struct Metrics {
    registry: Registry,
    decisions: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let decisions = IntCounterVec::new(
            Opts::new(
                "ingress_guard_decisions_total",
                "Admission decisions by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(decisions.clone()))?;
        Ok(Self { registry, decisions })
    }

    /// Record one decision.
    pub fn record(&self, decision: &Decision) {
        let outcome = match decision {
            Decision::Allowed { .. } => "allowed",
            Decision::Limited { reason, .. } => match reason {
                LimitReason::BotTraffic => "bot",
                LimitReason::DistributedAttack => "attack",
                LimitReason::TemporarilyBlocked => "blocked",
                LimitReason::RateExceeded => "rate_limited",
            },
        };
        self.decisions.with_label_values(&[outcome]).inc();
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
