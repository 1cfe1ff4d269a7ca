//! Error types for the API and storage seams

use thiserror::Error;

use crate::constants::GENERIC_LOGIN_FAILURE;

/// Failure of a single API call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Server answered with a non-2xx status
    #[error("request rejected with status {status}")]
    Rejected { status: u16, detail: Option<String> },

    /// Connection, timeout or other transport failure
    #[error("transport error: {0}")]
    Transport(String),

    /// 2xx response whose body was not the expected JSON
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected { .. })
    }

    /// Message suitable for the session's `last_error`
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => GENERIC_LOGIN_FAILURE.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Transport(format!("Request timed out: {}", e))
        } else if e.is_connect() {
            ApiError::Transport(format!("Connection failed: {}", e))
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(format!("Request failed: {}", e))
        }
    }
}

/// Failure of the persisted token slot
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("token storage I/O: {0}")]
    Io(#[from] std::io::Error),
}
