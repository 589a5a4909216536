// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Distributed attack detection.
//!
//! Two independent heuristics, both evaluated before any per-key counting:
//!
//! 1. **Suspicion escalation** — identities accumulate a violation count on
//!    every block event; past a threshold the identity is rejected outright.
//! 2. **Subnet clustering** — each identity is attributed to its subnet
//!    prefix; a subnet that accumulates too many distinct identities inside
//!    the detection horizon is treated as a coordinated attack and every
//!    request from it is rejected until the cluster entry ages out.
//!
//! Cluster entries carry their own horizon instead of being cleared
//! wholesale on cleanup; see DESIGN.md.

use crate::config::DetectionConfig;
use dashmap::DashMap;
use std::collections::HashSet;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::warn;

/// Distinct identities observed from one subnet prefix.
struct SubnetCluster {
    identities: HashSet<String>,
    opened_at: Instant,
}

impl SubnetCluster {
    fn new(now: Instant) -> Self {
        Self {
            identities: HashSet::new(),
            opened_at: now,
        }
    }
}

/// Shared suspicion and clustering state.
pub struct AttackDetector {
    config: DetectionConfig,
    /// identity -> violation count, grows on block events
    suspicion: DashMap<String, u32>,
    /// subnet prefix -> cluster of distinct identities
    clusters: DashMap<String, SubnetCluster>,
}

impl AttackDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            suspicion: DashMap::new(),
            clusters: DashMap::new(),
        }
    }

    /// Whether the identity has any recorded violations. Used by the quota
    /// calculator to halve the ceiling for repeat offenders.
    pub fn is_suspicious(&self, identity: &str) -> bool {
        self.suspicion.get(identity).map(|c| *c > 0).unwrap_or(false)
    }

    /// Whether the identity's violation count is past the outright-block
    /// threshold.
    pub fn escalated(&self, identity: &str) -> bool {
        self.suspicion
            .get(identity)
            .map(|count| *count > self.config.suspicion_threshold)
            .unwrap_or(false)
    }

    /// Record a violation (block event) against an identity.
    pub fn record_violation(&self, identity: &str) {
        let mut entry = self.suspicion.entry(identity.to_string()).or_insert(0);
        *entry += 1;
        if *entry > self.config.suspicion_threshold {
            warn!(identity, violations = *entry, "Identity escalated to attack suspect");
        }
    }

    /// Forget an identity's violations (manual unblock).
    pub fn clear(&self, identity: &str) {
        self.suspicion.remove(identity);
    }

    /// Attribute the identity to its subnet cluster. Returns the remaining
    /// cluster horizon when the subnet has reached attack cardinality,
    /// `None` otherwise. Identities that are not literal IPs are never
    /// clustered.
    pub fn observe_subnet(&self, identity: &str) -> Option<Duration> {
        let prefix = subnet_prefix(identity)?;
        let now = Instant::now();
        let horizon = self.config.cluster_horizon();

        let mut entry = self
            .clusters
            .entry(prefix.clone())
            .or_insert_with(|| SubnetCluster::new(now));
        // Lazily restart a cluster whose horizon has passed
        if now.duration_since(entry.opened_at) >= horizon {
            *entry = SubnetCluster::new(now);
        }
        entry.identities.insert(identity.to_string());

        if entry.identities.len() >= self.config.subnet_threshold {
            let remaining = horizon.saturating_sub(now.duration_since(entry.opened_at));
            warn!(
                subnet = %prefix,
                identities = entry.identities.len(),
                "Subnet flagged as coordinated attack"
            );
            Some(remaining)
        } else {
            None
        }
    }

    /// Number of identities with a live suspicion entry.
    pub fn suspicious_count(&self) -> usize {
        self.suspicion.len()
    }

    /// Drop cluster entries older than the detection horizon.
    pub fn expire_clusters(&self) {
        let now = Instant::now();
        let horizon = self.config.cluster_horizon();
        self.clusters
            .retain(|_, cluster| now.duration_since(cluster.opened_at) < horizon);
    }

    /// Prune low-score suspicion entries once the table outgrows its bound.
    pub fn prune_suspicion(&self, bound: usize, min_score: u32) {
        if self.suspicion.len() <= bound {
            return;
        }
        self.suspicion.retain(|_, count| *count >= min_score);
    }
}

/// Subnet prefix for clustering: first three octets for IPv4, first four
/// hextets of the canonical form for IPv6.
pub fn subnet_prefix(identity: &str) -> Option<String> {
    match identity.parse::<IpAddr>().ok()? {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            Some(format!("{}.{}.{}", octets[0], octets[1], octets[2]))
        }
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            Some(format!(
                "{:x}:{:x}:{:x}:{:x}",
                segments[0], segments[1], segments[2], segments[3]
            ))
        }
    }
}
