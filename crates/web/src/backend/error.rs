//! Error types for backend API interactions.

use thiserror::Error;

/// Errors that can occur when calling the auth or chat backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport error (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an error envelope or status.
    #[error("Backend error: {message}")]
    Api {
        /// Message from the backend's `msg` field, or the raw body.
        message: String,
    },

    /// Failed to parse a backend response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error while consuming a streaming response.
    #[error("Stream error: {0}")]
    Stream(String),

    /// A backend URL could not be constructed.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// Whether retrying the same call might succeed.
    ///
    /// Transport and stream failures are transient; envelope and parse
    /// errors are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Stream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = BackendError::Api {
            message: "unknown model".to_owned(),
        };
        assert_eq!(err.to_string(), "Backend error: unknown model");
    }

    #[test]
    fn test_transient_classification() {
        assert!(
            BackendError::Stream("connection reset".to_owned()).is_transient()
        );
        assert!(
            !BackendError::Api {
                message: "bad request".to_owned()
            }
            .is_transient()
        );
        assert!(!BackendError::Parse("truncated".to_owned()).is_transient());
    }
}
