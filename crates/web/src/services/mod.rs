//! Service layer: the logic between route handlers and the backend client.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod models;

pub use admin::{ActionOutcome, AdminAction, AdminRow, AdminTable, BatchReport, UserFilter};
pub use auth::{AuthFlow, SignupForm};
pub use chat::ChatService;
pub use models::{ModelCatalog, ModelInfo};
