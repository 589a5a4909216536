// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission control core: fixed-window counting per composite key with
//! dynamic quotas, escalating blocks, and distributed-attack rejection.
//!
//! Decision order per request:
//!
//! 1. Bot signature match — immediate rejection, no counters touched
//! 2. Suspicion escalation / subnet clustering — immediate rejection
//! 3. Manual identity block — immediate rejection
//! 4. Window record fetch-or-create, dynamic quota, increment, compare
//!
//! All shared state lives behind sharded concurrent maps; no guard is ever
//! held across an await point. The progressive delay suspends only the
//! calling request's future.

use crate::bots::BotSignatures;
use crate::config::Config;
use crate::context::RequestContext;
use crate::detector::AttackDetector;
use crate::{fingerprint, identity};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Custom composite-key generator: (context, identity, fingerprint) -> key.
pub type KeyGenerator = dyn Fn(&RequestContext, &str, &str) -> String + Send + Sync;

/// Invoked when a key crosses into the throttled state: (key, identity).
pub type BlockCallback = dyn Fn(&str, &str) + Send + Sync;

/// Result of an admission check.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Request admitted
    Allowed {
        /// Remaining quota in the current window
        remaining: u32,
        /// Time until the window resets
        reset_in: Duration,
    },
    /// Request rejected
    Limited {
        /// Why the request was rejected
        reason: LimitReason,
        /// Time the client should wait before retrying
        retry_after: Duration,
    },
}

impl Decision {
    pub fn is_limited(&self) -> bool {
        matches!(self, Decision::Limited { .. })
    }
}

/// Reason a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitReason {
    /// User-agent matched a known automation signature
    BotTraffic,
    /// Identity or subnet flagged by the attack detector
    DistributedAttack,
    /// Key or identity is inside an active block
    TemporarilyBlocked,
    /// Window counter crossed the dynamic ceiling
    RateExceeded,
}

impl std::fmt::Display for LimitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BotTraffic => write!(f, "bot traffic detected"),
            Self::DistributedAttack => write!(f, "distributed attack detected"),
            Self::TemporarilyBlocked => write!(f, "temporarily blocked"),
            Self::RateExceeded => write!(f, "rate limit exceeded"),
        }
    }
}

/// Mutable per-key window state.
#[derive(Debug)]
struct WindowRecord {
    request_count: u32,
    window_reset_at: Instant,
    blocked_until: Option<Instant>,
    first_seen_at: Instant,
    last_seen_at: Instant,
    /// Every resolved client address seen under this key
    identities: HashSet<String>,
    /// Every user-agent seen under this key
    agents: HashSet<String>,
    fingerprint: String,
}

impl WindowRecord {
    fn new(now: Instant, window: Duration, fingerprint: String) -> Self {
        Self {
            request_count: 0,
            window_reset_at: now + window,
            blocked_until: None,
            first_seen_at: now,
            last_seen_at: now,
            identities: HashSet::new(),
            agents: HashSet::new(),
            fingerprint,
        }
    }
}

/// Read-only snapshot of the controller's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Live window records (including synthetic manual blocks)
    pub active_keys: usize,
    /// Sum of request counts across live records
    pub total_requests: u64,
    /// Identities with a live suspicion entry
    pub suspicious_identities: usize,
    /// Seeded plus learned bot signatures
    pub bot_signatures: usize,
}

// Outcome of the locked window-record section; side effects and any delay
// happen after the map guard is dropped.
enum Tally {
    StillBlocked(Duration),
    Throttled { retry_after: Duration },
    Admitted { remaining: u32, reset_in: Duration, delay: Option<Duration> },
}

/// Admission controller instance. Owns all shared state; independent
/// instances with different configs can coexist (there are no globals).
pub struct AdmissionControl {
    config: Config,
    records: DashMap<String, WindowRecord>,
    detector: AttackDetector,
    signatures: BotSignatures,
    key_generator: Option<Box<KeyGenerator>>,
    block_callback: Option<Box<BlockCallback>>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl AdmissionControl {
    /// Create a controller. Fails only on an invalid configuration.
    pub fn new(config: Config) -> Result<Self, crate::config::ConfigError> {
        config.validate()?;
        let detector = AttackDetector::new(config.detection.clone());
        Ok(Self {
            config,
            records: DashMap::new(),
            detector,
            signatures: BotSignatures::new(),
            key_generator: None,
            block_callback: None,
            cleanup_task: Mutex::new(None),
        })
    }

    /// Replace the default `identity:path:fingerprint` key with a custom
    /// generator.
    pub fn with_key_generator(
        mut self,
        generator: impl Fn(&RequestContext, &str, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.key_generator = Some(Box::new(generator));
        self
    }

    /// Register a callback fired when a key crosses into the throttled
    /// state.
    pub fn with_block_callback(
        mut self,
        callback: impl Fn(&str, &str) + Send + Sync + 'static,
    ) -> Self {
        self.block_callback = Some(Box::new(callback));
        self
    }

    /// Run the admission check for one request.
    pub async fn check(&self, ctx: &RequestContext) -> Decision {
        let client = identity::resolve_identity(ctx);
        let agent = ctx.user_agent.as_deref().unwrap_or("");

        // Known automation: reject before any counter is consulted
        if self.signatures.matches(agent) {
            info!(identity = %client, agent, "Bot signature matched");
            return Decision::Limited {
                reason: LimitReason::BotTraffic,
                retry_after: self.config.admission.window_duration(),
            };
        }

        // Attack detector short-circuits
        if self.detector.escalated(&client) {
            // The agent string is now independently implicated
            self.signatures.learn(agent);
            warn!(identity = %client, "Rejecting escalated attack suspect");
            return Decision::Limited {
                reason: LimitReason::DistributedAttack,
                retry_after: self.config.detection.attack_retry(),
            };
        }
        if let Some(remaining_horizon) = self.detector.observe_subnet(&client) {
            warn!(identity = %client, "Rejecting request from clustered subnet");
            return Decision::Limited {
                reason: LimitReason::DistributedAttack,
                retry_after: remaining_horizon.max(Duration::from_secs(1)),
            };
        }

        // Manual identity-level block
        let now = Instant::now();
        if let Some(record) = self.records.get(&override_key(&client)) {
            if let Some(until) = record.blocked_until {
                if until > now {
                    debug!(identity = %client, "Identity under manual block");
                    return Decision::Limited {
                        reason: LimitReason::TemporarilyBlocked,
                        retry_after: until - now,
                    };
                }
            }
        }

        let print = fingerprint::fingerprint(ctx);
        let key = match &self.key_generator {
            Some(generator) => generator(ctx, &client, &print),
            None => format!("{client}:{}:{print}", ctx.normalized_path()),
        };

        let tally = self.tally(&key, &client, agent, &print, now);

        match tally {
            Tally::StillBlocked(retry_after) => {
                debug!(key = %key, ?retry_after, "Key inside active block");
                Decision::Limited {
                    reason: LimitReason::TemporarilyBlocked,
                    retry_after,
                }
            }
            Tally::Throttled { retry_after } => {
                self.detector.record_violation(&client);
                if let Some(callback) = &self.block_callback {
                    callback(&key, &client);
                }
                warn!(key = %key, identity = %client, ?retry_after, "Quota exceeded, key blocked");
                Decision::Limited {
                    reason: LimitReason::RateExceeded,
                    retry_after,
                }
            }
            Tally::Admitted { remaining, reset_in, delay } => {
                if let Some(delay) = delay {
                    // Soft backpressure for clients approaching their quota.
                    // Suspends only this request; dropping the future skips
                    // the remainder.
                    debug!(key = %key, ?delay, "Applying progressive delay");
                    tokio::time::sleep(delay).await;
                }
                debug!(key = %key, remaining, "Request admitted");
                Decision::Allowed { remaining, reset_in }
            }
        }
    }

    // Locked section: fetch-or-create the record, absorb observations,
    // increment, compare. Never awaits.
    fn tally(&self, key: &str, client: &str, agent: &str, print: &str, now: Instant) -> Tally {
        let window = self.config.admission.window_duration();
        let mut entry = self
            .records
            .entry(key.to_string())
            .or_insert_with(|| WindowRecord::new(now, window, print.to_string()));
        let record = entry.value_mut();

        if let Some(until) = record.blocked_until {
            if until > now {
                return Tally::StillBlocked(until - now);
            }
        }

        // Window elapsed: replace, never mutate in place
        if now >= record.window_reset_at {
            *record = WindowRecord::new(now, window, print.to_string());
        }

        record.last_seen_at = now;
        record.identities.insert(client.to_string());
        if !agent.is_empty() {
            record.agents.insert(agent.to_string());
        }

        let quota = self.effective_quota(record, client);
        record.request_count += 1;

        if record.request_count > quota {
            let overage = record.request_count - quota;
            let block = self.config.admission.block_duration() * overage.min(10);
            record.blocked_until = Some(now + block);
            Tally::Throttled { retry_after: block }
        } else {
            let delay = if self.config.admission.progressive_delay {
                self.progressive_delay(record.request_count, quota)
            } else {
                None
            };
            Tally::Admitted {
                remaining: quota - record.request_count,
                reset_in: record.window_reset_at.saturating_duration_since(now),
                delay,
            }
        }
    }

    /// Effective ceiling for a record: the base quota depressed by penalty
    /// multipliers, compounding multiplicatively, floored to an integer.
    fn effective_quota(&self, record: &WindowRecord, client: &str) -> u32 {
        let mut quota = self.config.admission.max_requests as f64;
        if self.detector.is_suspicious(client) {
            quota *= 0.5;
        }
        // Many addresses sharing one fingerprint: rotation signal
        if record.identities.len() > 5 {
            quota *= 0.3;
        }
        if record.agents.len() > 3 {
            quota *= 0.5;
        }
        quota.floor() as u32
    }

    /// Delay for a request within 80-100% of its ceiling, growing
    /// exponentially with proximity, capped at the configured maximum.
    fn progressive_delay(&self, count: u32, quota: u32) -> Option<Duration> {
        if quota == 0 {
            return None;
        }
        let ratio = count as f64 / quota as f64;
        if !(0.8..=1.0).contains(&ratio) {
            return None;
        }
        let millis = 100.0 * f64::powf(2.0, (ratio - 0.8) * 20.0);
        let capped = millis.min(self.config.admission.max_delay_ms as f64);
        Some(Duration::from_millis(capped as u64))
    }

    /// One garbage-collection pass. Idempotent; safe to call from tests at
    /// any point. Never removes a record whose block is still active.
    pub fn run_cleanup(&self) {
        let now = Instant::now();
        let grace = self.config.cleanup.grace();

        let before = self.records.len();
        self.records.retain(|_, record| {
            if let Some(until) = record.blocked_until {
                if until > now {
                    return true;
                }
            }
            now < record.window_reset_at + grace
        });
        let removed = before - self.records.len();

        self.detector.expire_clusters();
        self.detector.prune_suspicion(
            self.config.cleanup.suspicion_table_bound,
            self.config.cleanup.suspicion_min_score,
        );

        if removed > 0 {
            debug!(removed, remaining = self.records.len(), "Cleanup pass evicted records");
        }
    }

    /// Start the periodic cleanup task. Replaces (and aborts) a previously
    /// started task.
    pub fn spawn_cleanup(self: &Arc<Self>) {
        let service = Arc::clone(self);
        let interval = self.config.cleanup.interval();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                service.run_cleanup();
            }
        });
        if let Some(previous) = self.cleanup_task.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop the periodic cleanup task, if running.
    pub fn shutdown(&self) {
        if let Some(handle) = self.cleanup_task.lock().take() {
            handle.abort();
        }
    }

    /// Force-block an identity for an explicit duration, regardless of its
    /// counters. Writes a synthetic identity-keyed record.
    pub fn block_identity(&self, identity: &str, duration: Duration) {
        let now = Instant::now();
        let mut record =
            WindowRecord::new(now, self.config.admission.window_duration(), String::new());
        record.blocked_until = Some(now + duration);
        record.identities.insert(identity.to_string());
        self.records.insert(override_key(identity), record);
        info!(identity, ?duration, "Identity manually blocked");
    }

    /// Lift a manual block and clear the identity's suspicion entry.
    pub fn unblock_identity(&self, identity: &str) {
        self.records.remove(&override_key(identity));
        self.detector.clear(identity);
        info!(identity, "Identity manually unblocked");
    }

    /// Read-only snapshot of controller state.
    pub fn stats(&self) -> Stats {
        let total_requests = self
            .records
            .iter()
            .map(|record| u64::from(record.request_count))
            .sum();
        Stats {
            active_keys: self.records.len(),
            total_requests,
            suspicious_identities: self.detector.suspicious_count(),
            bot_signatures: self.signatures.len(),
        }
    }
}

impl Drop for AdmissionControl {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// Synthetic key for manual identity blocks; the "override:" prefix keeps it
// out of composite-key space (identities may themselves contain colons).
fn override_key(identity: &str) -> String {
    format!("override:{identity}")
}
