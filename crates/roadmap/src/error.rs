//! Error types for dispatch and generation

/// Errors from dispatching tasks and assembling roadmaps.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Selection stayed empty through the bounded wait-and-retry loop.
    #[error("no eligible API key after {0} waits")]
    Exhausted(u32),

    #[error("generation call failed: {0}")]
    Generation(#[from] gemini::Error),

    /// The skeleton response did not clean up into parseable JSON.
    /// Fatal to roadmap creation; chapter-level parse failures are
    /// tolerated and never surface as this.
    #[error("roadmap skeleton was not valid JSON: {0}")]
    SkeletonParse(String),

    #[error("internal dispatch error: {0}")]
    Internal(String),
}

/// Result alias for dispatch and generation.
pub type Result<T> = std::result::Result<T, Error>;
