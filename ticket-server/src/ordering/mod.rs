//! Sibling ordering
//!
//! Every board, status and ticket carries a 1-based `sort_order` that is
//! contiguous among the children of its parent. This module keeps it so:
//!
//! - [`engine`]: pure planning. Given the current sibling snapshot and a
//!   requested change, compute the minimal set of row writes.
//! - [`invariant`]: validation helpers and the post-plan contiguity check.
//! - [`guard`]: ownership checks against the authenticated user.
//! - [`fanout`]: bounded concurrent application of one write batch with
//!   first-error cancellation.
//! - [`coordinator`]: wraps each operation in one transaction, locks the
//!   affected parents and drives the writes.

pub mod coordinator;
pub mod engine;
pub mod fanout;
pub mod guard;
pub mod invariant;


pub use coordinator::{CoordinatorConfig, Movement, ReorderCoordinator};
pub use engine::ParentGroup;

use thiserror::Error;

use crate::db::{BoxError, ChildKind};

#[derive(Debug, Error)]
pub enum OrderingError {
    /// Malformed request, rejected before any store access
    #[error("{0}")]
    Invalid(String),

    #[error("duplicate {} id {id} in request", .kind.name())]
    DuplicateId { kind: ChildKind, id: i64 },

    #[error(
        "a target position is required when moving a {} to another {}",
        .kind.name(),
        .kind.parent_name()
    )]
    MissingTarget { kind: ChildKind },

    #[error("position {value} out of range [{min}, {max}] for {}", .kind.name())]
    OutOfRange {
        kind: ChildKind,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("{} {ids:?} not found{}", .kind.name(), parent_suffix(.kind, .parent_id))]
    NotFound {
        kind: ChildKind,
        ids: Vec<i64>,
        parent_id: Option<i64>,
    },

    #[error("unknown user {user_id}")]
    UnknownOwner { user_id: i64 },

    /// The locked snapshot contradicts what the request was built against
    #[error("{0}")]
    Conflict(String),

    #[error(
        "plan would leave {} {parent_id} with sort orders {orders:?}",
        .kind.parent_name()
    )]
    Invariant {
        kind: ChildKind,
        parent_id: i64,
        orders: Vec<i32>,
    },

    #[error("store error: {0}")]
    Store(#[from] BoxError),

    #[error("operation cancelled")]
    Cancelled,
}

fn parent_suffix(kind: &ChildKind, parent_id: &Option<i64>) -> String {
    match parent_id {
        Some(id) => format!(" under {} {id}", kind.parent_name()),
        None => String::new(),
    }
}

impl OrderingError {
    pub(crate) fn not_found(kind: ChildKind, id: i64, parent_id: Option<i64>) -> Self {
        Self::NotFound {
            kind,
            ids: vec![id],
            parent_id,
        }
    }

    /// Request-shape errors raised before the store is touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Invalid(_) | Self::DuplicateId { .. } | Self::MissingTarget { .. }
        )
    }
}
