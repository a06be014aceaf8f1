//! Error types for the fetch cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Fetch Error Enum ==
/// Failure of a single retrieval.
///
/// Cloneable so that one outcome can be handed to every caller waiting on
/// the same in-flight retrieval.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be sent or the connection failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body was not valid structured data
    #[error("Decode error: {0}")]
    Decode(String),

    /// The retrieval task ended without producing an outcome
    #[error("Retrieval aborted: {0}")]
    Aborted(String),
}

// == Cache Error Enum ==
/// Unified error type for the fetch cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not present in the cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Value could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Snapshot text could not be produced or parsed
    #[error("Invalid snapshot: {0}")]
    Snapshot(String),

    /// Retrieval through the transport failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::Snapshot(_) => StatusCode::BAD_REQUEST,
            CacheError::Fetch(_) => StatusCode::BAD_GATEWAY,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the fetch cache.
pub type Result<T> = std::result::Result<T, CacheError>;
