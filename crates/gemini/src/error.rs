//! Error types for generation calls

/// Errors from a single generation call.
///
/// Every variant counts as a failure against the key that carried the
/// call; the dispatcher reports it to the pool and surfaces the error
/// unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response carried no generated text")]
    EmptyResponse,

    #[error("malformed response payload: {0}")]
    MalformedResponse(String),
}

/// Result alias for generation calls.
pub type Result<T> = std::result::Result<T, Error>;
