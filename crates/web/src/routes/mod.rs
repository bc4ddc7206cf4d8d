//! Route handlers.

pub mod account;
pub mod admin;
pub mod auth;
pub mod chat;
pub mod home;

use axum::Router;
use tower_sessions::Session;

use crate::models::session_keys;
use crate::state::AppState;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(home::router())
        .merge(auth::router())
        .merge(account::router())
        .merge(chat::router())
        .merge(admin::router())
}

/// Store a one-shot notice shown on the next page render.
pub(crate) async fn set_flash(session: &Session, message: impl Into<String>) {
    let _ = session
        .insert(session_keys::FLASH_NOTICE, message.into())
        .await;
}

/// Take (and clear) the pending notice, if any.
pub(crate) async fn take_flash(session: &Session) -> Option<String> {
    session
        .remove::<String>(session_keys::FLASH_NOTICE)
        .await
        .ok()
        .flatten()
}
