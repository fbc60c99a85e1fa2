//! HTTP error envelope
//!
//! Every failure leaves the service as
//! `{"error":{"type":...,"message":...}}` with a status code derived
//! from the underlying error class.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Service-level error, convertible into an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or empty `x-user-id` header.
    MissingUser,
    Generation(roadmap::Error),
    Storage(store::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingUser => StatusCode::BAD_REQUEST,
            ApiError::Generation(roadmap::Error::Exhausted(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Generation(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(store::Error::Duplicate(_)) => StatusCode::CONFLICT,
            ApiError::Storage(store::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::MissingUser => "invalid_request",
            ApiError::Generation(roadmap::Error::Exhausted(_)) => "keys_exhausted",
            ApiError::Generation(roadmap::Error::SkeletonParse(_)) => "generation_parse_error",
            ApiError::Generation(_) => "generation_error",
            ApiError::Storage(store::Error::Duplicate(_)) => "duplicate_roadmap",
            ApiError::Storage(store::Error::NotFound(_)) => "not_found",
            ApiError::Storage(_) => "storage_error",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::MissingUser => "missing x-user-id header".into(),
            ApiError::Generation(e) => e.to_string(),
            ApiError::Storage(e) => e.to_string(),
        }
    }
}

impl From<roadmap::Error> for ApiError {
    fn from(e: roadmap::Error) -> Self {
        ApiError::Generation(e)
    }
}

impl From<store::Error> for ApiError {
    fn from(e: store::Error) -> Self {
        ApiError::Storage(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "type": self.error_type(),
                "message": self.message(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(ApiError::MissingUser.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Generation(roadmap::Error::SkeletonParse("bad json".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Generation(roadmap::Error::Exhausted(10)).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Storage(store::Error::Duplicate("u/rm".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Storage(store::Error::NotFound("rm".into())).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn error_types_are_stable_strings() {
        assert_eq!(
            ApiError::Storage(store::Error::Duplicate("u/rm".into())).error_type(),
            "duplicate_roadmap"
        );
        assert_eq!(
            ApiError::Generation(roadmap::Error::SkeletonParse("x".into())).error_type(),
            "generation_parse_error"
        );
    }
}
