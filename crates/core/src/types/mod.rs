//! Core types for the Carebot front-end.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credentials;
pub mod email;
pub mod id;
pub mod role;

pub use credentials::{CredentialError, Password, UserId, UserName};
pub use email::{Email, EmailError};
pub use id::*;
pub use role::{ChatRole, EffectiveRole};
