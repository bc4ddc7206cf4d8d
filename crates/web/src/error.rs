//! Unified error handling for the web front-end.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::backend::BackendError;

/// Authentication failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown account or wrong password.
    #[error("Invalid user id or password")]
    InvalidCredentials,

    /// The account exists but is suspended.
    #[error("This account is suspended")]
    AccountSuspended,

    /// No signed-in user in the session.
    #[error("Not signed in")]
    NotAuthenticated,
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// A form field failed local validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A signup field is already taken.
    #[error("{field} is already in use")]
    UniquenessConflict {
        /// The conflicting field's display name.
        field: String,
    },

    /// Authentication failed or is missing.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// The signed-in user lacks permission.
    #[error("Permission denied")]
    PermissionDenied,

    /// Signup consent has not been acknowledged.
    #[error("Consent is required before creating an account")]
    ConsentRequired,

    /// A backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session state could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::ConsentRequired => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UniquenessConflict { .. } => StatusCode::CONFLICT,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-safe message. Server-side detail stays in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Backend(_) => "The backend service is unavailable".to_owned(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_owned(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Backend(_) | Self::Session(_) | Self::Internal(_)) {
            tracing::error!(error = %self, "Request error");
        }

        (self.status(), self.public_message()).into_response()
    }
}
