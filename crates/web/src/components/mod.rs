//! Reusable page components.

pub mod user_table;

pub use user_table::{BulkActionButton, FilterOption, TableColumn, UserTableConfig};
