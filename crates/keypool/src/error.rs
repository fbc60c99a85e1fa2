//! Error types for key pool construction

/// Errors from pool construction.
///
/// Runtime exhaustion is not an error: `select_eligible` communicates
/// "no eligible key right now" with an empty vector. Only a pool that
/// could never serve anything is an error, and that is caught at
/// construction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no API keys configured")]
    NoKeysConfigured,
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
