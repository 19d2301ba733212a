//! Network failure types.

use std::sync::Arc;

/// A network exchange that produced no response at all.
///
/// HTTP error statuses are not failures: they arrive as responses.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Request timed out.
    #[error("request timeout")]
    Timeout,

    /// Connection could not be established (DNS, refused, offline).
    #[error("connection failed: {0}")]
    Connect(String),

    /// Request could not be built from the intercepted request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other transport error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connect(err.to_string())
        } else {
            FetchError::Network(Arc::new(err))
        }
    }
}

impl From<FetchError> for shellcache_core::Error {
    fn from(err: FetchError) -> Self {
        shellcache_core::Error::Network(err.to_string())
    }
}
