//! Data models
//!
//! Shared between ticket-server and its clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (PostgreSQL BIGSERIAL). `sort_order` is 1-based within
//! the row's parent.

pub mod board;
pub mod status;
pub mod text;
pub mod ticket;

// Re-exports
pub use board::*;
pub use status::*;
pub use ticket::*;
