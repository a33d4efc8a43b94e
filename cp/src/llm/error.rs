//! Provider transport errors

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to a hosted model provider
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Event stream error: {0}")]
    EventSource(String),
}

impl LlmError {
    /// HTTP status if the provider answered with an error
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::ApiError { status, .. } => Some(*status),
            LlmError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if the provider rejected the credential
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status() {
        let err = LlmError::ApiError {
            status: 500,
            message: "Server error".to_string(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(LlmError::InvalidResponse("x".to_string()).status(), None);
        assert_eq!(LlmError::Timeout(Duration::from_secs(1)).status(), None);
    }

    #[test]
    fn test_is_auth_failure() {
        assert!(
            LlmError::ApiError {
                status: 401,
                message: "Incorrect API key".to_string()
            }
            .is_auth_failure()
        );
        assert!(
            !LlmError::ApiError {
                status: 429,
                message: "Slow down".to_string()
            }
            .is_auth_failure()
        );
    }

    #[test]
    fn test_display() {
        let err = LlmError::ApiError {
            status: 404,
            message: "No such file".to_string(),
        };
        assert_eq!(err.to_string(), "API error 404: No such file");
    }
}
