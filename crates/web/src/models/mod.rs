//! Domain and session models.

pub mod session;

pub use session::{ChatMessage, CurrentUser, LoginView, SignupLocks, session_keys};
