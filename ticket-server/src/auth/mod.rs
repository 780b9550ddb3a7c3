//! Authentication middleware for user connections

pub mod user_auth;

pub use user_auth::UserIdentity;
