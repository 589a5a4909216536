// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Attack simulation patterns for security testing.

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Number of distinct client identities to simulate
    pub unique_identities: usize,
    /// Whether all identities share one /24 subnet
    pub same_subnet: bool,
    /// Number of distinct user agents cycled through
    pub unique_agents: usize,
    /// Number of distinct paths cycled through
    pub unique_paths: usize,
    /// Whether the traffic presents automation user-agents
    pub bot_traffic: bool,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_identities: 1,
            same_subnet: false,
            unique_agents: 1,
            unique_paths: 1,
            bot_traffic: false,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Single identity hammering one path - basic flood.
    pub fn single_identity_flood() -> Self {
        Self {
            total_requests: 200,
            ..Default::default()
        }
    }

    /// Many identities from one /24 hitting the same path - the
    /// coordinated pattern the subnet detector exists for.
    pub fn subnet_sweep() -> Self {
        Self {
            total_requests: 120,
            unique_identities: 25,
            same_subnet: true,
            ..Default::default()
        }
    }

    /// Automation user-agents, each request from a different identity.
    pub fn bot_sweep() -> Self {
        Self {
            total_requests: 50,
            unique_identities: 50,
            bot_traffic: true,
            ..Default::default()
        }
    }

    /// One client fingerprint rotating across many addresses.
    pub fn identity_rotation() -> Self {
        Self {
            total_requests: 60,
            unique_identities: 12,
            ..Default::default()
        }
    }

    /// Legitimate browsing: a handful of identities, light traffic,
    /// several paths.
    pub fn casual_browsing() -> Self {
        Self {
            total_requests: 40,
            unique_identities: 10,
            unique_agents: 5,
            unique_paths: 5,
            ..Default::default()
        }
    }
}
