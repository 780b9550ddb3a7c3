//! Shared types for the ticket tracker
//!
//! Domain models, request payloads and the unified error system used by
//! `ticket-server` and its clients.

pub mod error;
pub mod models;
pub mod request;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
