//! Persistence for roadmaps, courses, and learning history
//!
//! Two stores behind one facade: a Postgres backend (the source of
//! truth when reachable) and a local JSON-file mirror used when the
//! backend is down. Fallback is transparent and logged, never surfaced
//! to the caller — with one exception: a uniqueness violation on
//! `(user, roadmap id)` is a real rejection and always propagates.
//!
//! The uniqueness invariant is enforced by the storage layer (a unique
//! constraint in Postgres, a key-exists check in the local file), not
//! by application bookkeeping, so concurrent duplicate inserts lose at
//! the store.

pub mod backend;
pub mod error;
pub mod facade;
pub mod local;
pub mod models;

pub use error::{Error, Result};
pub use facade::Storage;
pub use local::{HistoryEntry, LocalStore};
