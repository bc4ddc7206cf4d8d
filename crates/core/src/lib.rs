//! Carebot Core - Shared types library.
//!
//! This crate provides common types used across all Carebot front-end
//! components:
//! - `web` - Server-rendered web UI (login, chat, admin)
//! - `cli` - Command-line launcher
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, credentials, and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
