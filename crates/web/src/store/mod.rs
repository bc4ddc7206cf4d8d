//! Local stores.

pub mod prototype;

pub use prototype::{PrototypeStore, PrototypeStoreError};
