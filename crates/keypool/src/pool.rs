//! Pool state and least-used-first key selection
//!
//! Slots live in a fixed-size table indexed by position; `KeyId` is the
//! index, so secrets are never used as map keys. The table is guarded by
//! a `std::sync::Mutex` held only for synchronous bookkeeping between
//! await points, which keeps updates from interleaving at sub-call
//! granularity under cooperative scheduling.
//!
//! Suspension transitions happen lazily: when a `Suspended` slot is
//! examined during selection and its deadline has passed, it transitions
//! back to `Active` with the failure counter cleared.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use common::Secret;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Position of a key slot in the pool table.
///
/// Opaque handle handed to callers by `select_eligible`; all `record_*`
/// operations take it back. Displayed as `key-{index}` in logs so the
/// secret itself never appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId(pub usize);

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key-{}", self.0)
    }
}

/// Runtime status of a key slot.
///
/// Transitions:
/// - Active → Suspended (consecutive failures reach the threshold)
/// - Suspended → Active (cooldown deadline passed, checked at selection)
#[derive(Debug, Clone)]
pub enum KeyStatus {
    Active,
    Suspended { until: Instant },
}

impl KeyStatus {
    /// Status label for health/logging.
    pub fn label(&self) -> &'static str {
        match self {
            KeyStatus::Active => "active",
            KeyStatus::Suspended { .. } => "suspended",
        }
    }
}

/// Pool tuning knobs.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Trailing window over which per-key calls are counted.
    pub window: Duration,
    /// Calls allowed per key within the window.
    pub max_calls_per_window: usize,
    /// Minimum gap between two calls on the same key.
    pub min_spacing: Duration,
    /// Consecutive failures before a key is suspended.
    pub failure_threshold: u32,
    /// How long a suspended key stays out of rotation.
    pub cooldown: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        // Tuned for the free-tier generation quota: 15 calls/minute/key
        // with a little headroom between calls.
        Self {
            window: Duration::from_secs(60),
            max_calls_per_window: 15,
            min_spacing: Duration::from_secs(2),
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Per-key bookkeeping.
struct KeySlot {
    key: Secret<String>,
    /// Call timestamps inside the trailing window, oldest first.
    recent_calls: VecDeque<Instant>,
    last_call: Option<Instant>,
    consecutive_failures: u32,
    status: KeyStatus,
}

impl KeySlot {
    fn new(key: Secret<String>) -> Self {
        Self {
            key,
            recent_calls: VecDeque::new(),
            last_call: None,
            consecutive_failures: 0,
            status: KeyStatus::Active,
        }
    }

    /// Drop call timestamps that fell out of the trailing window.
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(front) = self.recent_calls.front() {
            if now.duration_since(*front) >= window {
                self.recent_calls.pop_front();
            } else {
                break;
            }
        }
    }
}

/// In-memory pool of generation API keys.
///
/// Explicitly constructed and passed down (no global singleton), so
/// tests and independent pipelines can each hold their own instance.
pub struct KeyPool {
    slots: Mutex<Vec<KeySlot>>,
    config: PoolConfig,
}

impl KeyPool {
    /// Create a pool from the configured keys.
    ///
    /// An empty key list is a configuration error, distinct from the
    /// transient "every key is busy" condition that `select_eligible`
    /// reports with an empty vector.
    pub fn new(keys: Vec<Secret<String>>, config: PoolConfig) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::NoKeysConfigured);
        }
        info!(keys = keys.len(), "key pool initialized");
        Ok(Self {
            slots: Mutex::new(keys.into_iter().map(KeySlot::new).collect()),
            config,
        })
    }

    /// Number of configured keys.
    pub fn len(&self) -> usize {
        self.slots.lock().expect("pool mutex poisoned").len()
    }

    /// Whether the pool has no keys. Always false for a constructed pool.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return up to `n` eligible key ids, least-used first.
    ///
    /// A slot is eligible when it is `Active` (or its suspension has
    /// expired), below the per-window call cap, and at least
    /// `min_spacing` past its last call. Ordering prefers fewest calls
    /// in the window, ties broken by oldest last call (never-used slots
    /// first).
    ///
    /// Besides the lazy suspension-expiry transition, selection records
    /// nothing: callers must `record_usage` for each key they dispatch.
    pub fn select_eligible(&self, n: usize) -> Vec<KeyId> {
        if n == 0 {
            return Vec::new();
        }
        let now = Instant::now();
        let mut slots = self.slots.lock().expect("pool mutex poisoned");

        let mut eligible: Vec<(usize, usize, Option<Instant>)> = Vec::new();
        for (idx, slot) in slots.iter_mut().enumerate() {
            if let KeyStatus::Suspended { until } = slot.status {
                if now >= until {
                    info!(key = %KeyId(idx), "cooldown expired, key reinstated");
                    slot.status = KeyStatus::Active;
                    slot.consecutive_failures = 0;
                } else {
                    continue;
                }
            }

            slot.prune(now, self.config.window);
            if slot.recent_calls.len() >= self.config.max_calls_per_window {
                continue;
            }
            if let Some(last) = slot.last_call
                && now.duration_since(last) < self.config.min_spacing
            {
                continue;
            }

            eligible.push((idx, slot.recent_calls.len(), slot.last_call));
        }

        // Fewest calls in the window first; older last-call wins ties,
        // with never-used slots ahead of everything.
        eligible.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.2.cmp(&b.2)));
        eligible.truncate(n);

        debug!(
            requested = n,
            selected = eligible.len(),
            "selected eligible keys"
        );
        eligible.into_iter().map(|(idx, _, _)| KeyId(idx)).collect()
    }

    /// Clone the secret key material for a slot (request construction).
    pub fn key(&self, id: KeyId) -> Option<Secret<String>> {
        let slots = self.slots.lock().expect("pool mutex poisoned");
        slots.get(id.0).map(|s| s.key.clone())
    }

    /// Record a dispatch against a key: append a call timestamp and
    /// update the last-call time.
    pub fn record_usage(&self, id: KeyId) {
        let now = Instant::now();
        let mut slots = self.slots.lock().expect("pool mutex poisoned");
        let Some(slot) = slots.get_mut(id.0) else {
            warn!(key = %id, "record_usage for unknown key slot");
            return;
        };
        slot.prune(now, self.config.window);
        slot.recent_calls.push_back(now);
        slot.last_call = Some(now);
    }

    /// Record a failed outcome. At the configured threshold the key is
    /// suspended for the cooldown duration.
    pub fn record_failure(&self, id: KeyId) {
        let mut slots = self.slots.lock().expect("pool mutex poisoned");
        let Some(slot) = slots.get_mut(id.0) else {
            warn!(key = %id, "record_failure for unknown key slot");
            return;
        };
        slot.consecutive_failures += 1;
        if slot.consecutive_failures >= self.config.failure_threshold {
            let until = Instant::now() + self.config.cooldown;
            warn!(
                key = %id,
                failures = slot.consecutive_failures,
                cooldown_secs = self.config.cooldown.as_secs(),
                "key suspended after consecutive failures"
            );
            slot.status = KeyStatus::Suspended { until };
        } else {
            debug!(key = %id, failures = slot.consecutive_failures, "key failure recorded");
        }
    }

    /// Record a successful outcome: clear the failure counter and make
    /// sure the slot is active.
    pub fn record_success(&self, id: KeyId) {
        let mut slots = self.slots.lock().expect("pool mutex poisoned");
        let Some(slot) = slots.get_mut(id.0) else {
            warn!(key = %id, "record_success for unknown key slot");
            return;
        };
        slot.consecutive_failures = 0;
        slot.status = KeyStatus::Active;
    }

    /// Pool health summary for the health endpoint.
    ///
    /// Status mapping: all keys active → healthy, some active →
    /// degraded, none active → unhealthy. Expired suspensions count as
    /// active here even before a selection has reinstated them.
    pub fn health(&self) -> serde_json::Value {
        let slots = self.slots.lock().expect("pool mutex poisoned");
        let now = Instant::now();

        let mut keys = Vec::new();
        let mut active_count = 0usize;
        let mut suspended_count = 0usize;

        for (idx, slot) in slots.iter().enumerate() {
            match slot.status {
                KeyStatus::Suspended { until } if until > now => {
                    suspended_count += 1;
                    keys.push(serde_json::json!({
                        "id": KeyId(idx).to_string(),
                        "status": "suspended",
                        "cooldown_remaining_secs": (until - now).as_secs(),
                    }));
                }
                _ => {
                    active_count += 1;
                    keys.push(serde_json::json!({
                        "id": KeyId(idx).to_string(),
                        "status": "active",
                        "calls_in_window": slot.recent_calls.len(),
                    }));
                }
            }
        }

        let total = slots.len();
        let pool_status = if active_count == total && total > 0 {
            "healthy"
        } else if active_count > 0 {
            "degraded"
        } else {
            "unhealthy"
        };

        serde_json::json!({
            "status": pool_status,
            "keys_total": total,
            "keys_active": active_count,
            "keys_suspended": suspended_count,
            "keys": keys,
        })
    }
}
