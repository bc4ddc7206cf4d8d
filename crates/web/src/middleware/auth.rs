//! Authentication extractors.
//!
//! Route handlers declare their requirement by taking one of these
//! extractors; rejection behavior depends on whether the request targets
//! an `/api/` path (status code) or a page (redirect).

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn chat_page(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.user_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Rejection when a signed-in user is required but absent.
pub enum AuthRejection {
    /// Redirect to the login page (page requests).
    RedirectToLogin,
    /// 401 Unauthorized (API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // The session lives in extensions, put there by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                if parts.uri.path().starts_with("/api/") {
                    AuthRejection::Unauthorized
                } else {
                    AuthRejection::RedirectToLogin
                }
            })?;

        Ok(Self(user))
    }
}

/// Extractor that optionally reads the current user.
///
/// Never rejects; anonymous requests get `None`.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Extractor that requires a signed-in admin.
///
/// Non-admins are sent to the no-access page (or get 403 on `/api/` paths).
pub struct RequireAdmin(pub CurrentUser);

/// Rejection for the admin requirement.
pub enum AdminRejection {
    /// Redirect to the login page (page requests).
    RedirectToLogin,
    /// 401 Unauthorized (API requests).
    Unauthorized,
    /// Signed in, but not an admin: the no-access page.
    NoAccess,
    /// Signed in, but not an admin (API requests): 403.
    Forbidden,
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::NoAccess => Redirect::to("/no-access").into_response(),
            Self::Forbidden => {
                (StatusCode::FORBIDDEN, "Admin access required").into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AdminRejection::Unauthorized)?;

        let is_api = parts.uri.path().starts_with("/api/");

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or(if is_api {
                AdminRejection::Unauthorized
            } else {
                AdminRejection::RedirectToLogin
            })?;

        if !user.admin {
            return Err(if is_api {
                AdminRejection::Forbidden
            } else {
                AdminRejection::NoAccess
            });
        }

        Ok(Self(user))
    }
}

/// Store the signed-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}
