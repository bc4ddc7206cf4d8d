//! HTTP client for the two remote backends.
//!
//! The front-end owns no business logic: user records live behind the auth
//! backend, inference behind the chat backend. This module wraps both with
//! typed endpoints and an SSE fragment stream for chat replies.

mod client;
mod error;
mod types;

pub use client::BackendClient;
pub use error::BackendError;
pub use types::{
    LoginOutcome, NewUser, RowOutcome, SelfUpdate, UniqueCheck, UniqueField, UserProfile,
    UserRecord,
};
