// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the ingress admission controller.
//!
//! All knobs are immutable once the service is constructed. A zero window,
//! quota, or block duration is a construction-time error, never a
//! per-request one.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Fatal configuration errors, surfaced at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("window duration must be non-zero")]
    ZeroWindow,

    #[error("base request quota must be non-zero")]
    ZeroQuota,

    #[error("block duration unit must be non-zero")]
    ZeroBlockDuration,
}

/// Configuration for the ingress-guard service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Admission window / quota configuration
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// Distributed-attack detection configuration
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Garbage collection configuration
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Per-key fixed-window admission configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Counting window duration in milliseconds (default: 60000)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Base maximum requests per window per key, before penalty
    /// multipliers (default: 60)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Block duration unit in milliseconds; scaled linearly by overage,
    /// capped at 10 units (default: 60000)
    #[serde(default = "default_block_duration_ms")]
    pub block_duration_ms: u64,

    /// Apply artificial delay to requests approaching their quota
    /// (default: false)
    #[serde(default)]
    pub progressive_delay: bool,

    /// Upper bound on the progressive delay in milliseconds (default: 5000)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Distributed-attack detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Violation count above which an identity is blocked outright
    /// (default: 10)
    #[serde(default = "default_suspicion_threshold")]
    pub suspicion_threshold: u32,

    /// Distinct identities per subnet at which the subnet is treated as a
    /// coordinated attack (default: 20)
    #[serde(default = "default_subnet_threshold")]
    pub subnet_threshold: usize,

    /// Retry-After returned on attack-detection blocks, in seconds
    /// (default: 300)
    #[serde(default = "default_attack_retry_secs")]
    pub attack_retry_secs: u64,

    /// Lifetime of a subnet cluster entry in seconds (default: 300)
    #[serde(default = "default_cluster_horizon_secs")]
    pub cluster_horizon_secs: u64,
}

/// Garbage collection tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Interval between automatic cleanup passes, in seconds (default: 60)
    #[serde(default = "default_cleanup_interval_secs")]
    pub interval_secs: u64,

    /// Grace period after window expiry before a record is collectable,
    /// in milliseconds (default: 120000)
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,

    /// Suspicion table size above which low-score entries are pruned
    /// (default: 10000)
    #[serde(default = "default_suspicion_table_bound")]
    pub suspicion_table_bound: usize,

    /// Minimum violation count an entry must hold to survive pruning
    /// (default: 3)
    #[serde(default = "default_suspicion_min_score")]
    pub suspicion_min_score: u32,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_max_requests() -> u32 {
    60
}

fn default_block_duration_ms() -> u64 {
    60_000
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_suspicion_threshold() -> u32 {
    10
}

fn default_subnet_threshold() -> usize {
    20
}

fn default_attack_retry_secs() -> u64 {
    300
}

fn default_cluster_horizon_secs() -> u64 {
    300
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_grace_ms() -> u64 {
    120_000
}

fn default_suspicion_table_bound() -> usize {
    10_000
}

fn default_suspicion_min_score() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            admission: AdmissionConfig::default(),
            detection: DetectionConfig::default(),
            cleanup: CleanupConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            max_requests: default_max_requests(),
            block_duration_ms: default_block_duration_ms(),
            progressive_delay: false,
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            suspicion_threshold: default_suspicion_threshold(),
            subnet_threshold: default_subnet_threshold(),
            attack_retry_secs: default_attack_retry_secs(),
            cluster_horizon_secs: default_cluster_horizon_secs(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval_secs(),
            grace_ms: default_grace_ms(),
            suspicion_table_bound: default_suspicion_table_bound(),
            suspicion_min_score: default_suspicion_min_score(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Config {
    /// Validate the configuration. Called by the service constructor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admission.window_ms == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.admission.max_requests == 0 {
            return Err(ConfigError::ZeroQuota);
        }
        if self.admission.block_duration_ms == 0 {
            return Err(ConfigError::ZeroBlockDuration);
        }
        Ok(())
    }
}

impl AdmissionConfig {
    /// Get the counting window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Get the block duration unit
    pub fn block_duration(&self) -> Duration {
        Duration::from_millis(self.block_duration_ms)
    }

    /// Get the progressive delay ceiling
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl DetectionConfig {
    /// Get the Retry-After applied on attack-detection blocks
    pub fn attack_retry(&self) -> Duration {
        Duration::from_secs(self.attack_retry_secs)
    }

    /// Get the subnet cluster lifetime
    pub fn cluster_horizon(&self) -> Duration {
        Duration::from_secs(self.cluster_horizon_secs)
    }
}

impl CleanupConfig {
    /// Get the interval between automatic cleanup passes
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Get the post-window grace period
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = Config::default();
        config.admission.window_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroWindow)));
    }

    #[test]
    fn test_zero_quota_rejected() {
        let mut config = Config::default();
        config.admission.max_requests = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroQuota)));
    }

    #[test]
    fn test_duration_helpers() {
        let config = AdmissionConfig::default();
        assert_eq!(config.window_duration(), Duration::from_secs(60));
        assert_eq!(config.block_duration(), Duration::from_secs(60));
    }
}
