//! Session layer configuration.
//!
//! Sessions are held in process memory; the front-end carries no
//! persistence engine. Restarting the process signs everyone out.

use tower_sessions::{
    Expiry, MemoryStore, SessionManagerLayer,
    cookie::{SameSite, time::Duration},
};

/// Session cookie name.
const SESSION_COOKIE_NAME: &str = "carebot_session";

/// Sessions expire after this much inactivity.
const SESSION_INACTIVITY_HOURS: i64 = 24;

/// Build the session middleware layer.
#[must_use]
pub fn create_session_layer() -> SessionManagerLayer<MemoryStore> {
    let store = MemoryStore::default();

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            SESSION_INACTIVITY_HOURS,
        )))
        .with_same_site(SameSite::Strict)
        .with_http_only(true)
        // TLS terminates at the proxy in front of this process
        .with_secure(false)
}
