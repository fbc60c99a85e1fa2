//! Error types for persistence

use thiserror::Error;

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The `(user, roadmap id)` pair already exists. Raised by the
    /// unique constraint in Postgres or the key check in the local
    /// store; never swallowed by fallback.
    #[error("roadmap already exists for this user: {0}")]
    Duplicate(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("local store I/O error: {0}")]
    Io(String),

    #[error("stored payload did not deserialize: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether falling back to the local store is appropriate. Data
    /// rejections (duplicates, lookup misses, corrupt payloads) are
    /// answers, not outages.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_not_infrastructure_failures() {
        assert!(!Error::Duplicate("u1/rm-1".into()).is_infrastructure());
        assert!(!Error::NotFound("rm-1".into()).is_infrastructure());
        assert!(Error::Io("disk full".into()).is_infrastructure());
        assert!(Error::Database(sqlx::Error::PoolClosed).is_infrastructure());
    }
}
