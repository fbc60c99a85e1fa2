//! API key pool for fanning out generation requests
//!
//! Manages multiple generation API keys with least-used-first selection,
//! a per-key trailing usage window, minimum inter-call spacing, and a
//! consecutive-failure suspension state machine. All bookkeeping is
//! in-memory only; a process restart resets it.
//!
//! Key lifecycle:
//! 1. Keys are loaded from config at startup, each slot starts `Active`
//! 2. `select_eligible(n)` returns up to n least-used eligible slots
//! 3. The dispatcher records usage before the call, then success/failure
//! 4. Failures reaching the threshold suspend the slot for the cooldown
//! 5. An expired suspension is reinstated at the next selection, with
//!    the failure counter cleared
//!
//! Suspension expiry is a deadline check at selection time, not a
//! background timer, so pool behavior is deterministic in tests.

pub mod error;
pub mod pool;

pub use error::{Error, Result};
pub use pool::{KeyId, KeyPool, KeyStatus, PoolConfig};
