//! Database access layer
//!
//! Two seams:
//! - [`OrderedStore`]: pool-level reads that run before a transaction opens
//!   (ownership guard queries).
//! - [`StoreTx`]: one open transaction. Every method takes `&self` so the
//!   write fan-out can share the handle; rollback happens when the handle is
//!   dropped without [`StoreTx::commit`].
//!
//! Read-only queries used to render responses live in [`boards`],
//! [`statuses`] and [`tickets`].

pub mod boards;
pub mod pg;
pub mod statuses;
pub mod tickets;

#[cfg(test)]
pub mod memory;

pub use pg::PgStore;

use async_trait::async_trait;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An ordered child collection: boards under a user, statuses under a
/// board, tickets under a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKind {
    Board,
    Status,
    Ticket,
}

impl ChildKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::Status => "status",
            Self::Ticket => "ticket",
        }
    }

    pub fn parent_name(&self) -> &'static str {
        match self {
            Self::Board => "user",
            Self::Status => "board",
            Self::Ticket => "status",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Self::Board => "boards",
            Self::Status => "statuses",
            Self::Ticket => "tickets",
        }
    }

    pub fn parent_table(&self) -> &'static str {
        match self {
            Self::Board => "users",
            Self::Status => "boards",
            Self::Ticket => "statuses",
        }
    }

    pub fn parent_column(&self) -> &'static str {
        match self {
            Self::Board => "user_id",
            Self::Status => "board_id",
            Self::Ticket => "status_id",
        }
    }

    /// Kind of the parent row; `None` when the parent is the user.
    pub fn parent_kind(&self) -> Option<ChildKind> {
        match self {
            Self::Board => None,
            Self::Status => Some(Self::Board),
            Self::Ticket => Some(Self::Status),
        }
    }

    /// The collection nested under rows of this kind.
    pub fn child(&self) -> Option<ChildKind> {
        match self {
            Self::Board => Some(Self::Status),
            Self::Status => Some(Self::Ticket),
            Self::Ticket => None,
        }
    }

    /// Position in the containment chain (user = 0).
    pub(crate) fn depth(&self) -> u8 {
        match self {
            Self::Board => 1,
            Self::Status => 2,
            Self::Ticket => 3,
        }
    }
}

/// The ordering-relevant columns of one child row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct SiblingRow {
    pub id: i64,
    pub parent_id: i64,
    pub sort_order: i32,
}

/// Containment path from the authenticated user down to one resource.
///
/// Every variant carries the user id, so a chain can only be satisfied by
/// rows the user owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipChain {
    User {
        user_id: i64,
    },
    Board {
        user_id: i64,
        board_id: i64,
    },
    Status {
        user_id: i64,
        board_id: i64,
        status_id: i64,
    },
    Ticket {
        user_id: i64,
        board_id: i64,
        status_id: i64,
        ticket_id: i64,
    },
}

impl OwnershipChain {
    pub fn user_id(&self) -> i64 {
        match *self {
            Self::User { user_id }
            | Self::Board { user_id, .. }
            | Self::Status { user_id, .. }
            | Self::Ticket { user_id, .. } => user_id,
        }
    }

    /// Id of the innermost resource (the user id for [`OwnershipChain::User`]).
    pub fn leaf_id(&self) -> i64 {
        match *self {
            Self::User { user_id } => user_id,
            Self::Board { board_id, .. } => board_id,
            Self::Status { status_id, .. } => status_id,
            Self::Ticket { ticket_id, .. } => ticket_id,
        }
    }

    /// Kind of the innermost resource; `None` for the user itself.
    pub fn leaf_kind(&self) -> Option<ChildKind> {
        match self {
            Self::User { .. } => None,
            Self::Board { .. } => Some(ChildKind::Board),
            Self::Status { .. } => Some(ChildKind::Status),
            Self::Ticket { .. } => Some(ChildKind::Ticket),
        }
    }

    /// Kind of the ordered collection directly under the innermost resource.
    pub fn child_kind(&self) -> Option<ChildKind> {
        match self.leaf_kind() {
            None => Some(ChildKind::Board),
            Some(kind) => kind.child(),
        }
    }

    pub(crate) fn depth(&self) -> u8 {
        self.leaf_kind().map_or(0, |k| k.depth())
    }

    /// Extend the chain by one level.
    pub fn child(&self, id: i64) -> Option<OwnershipChain> {
        match *self {
            Self::User { user_id } => Some(Self::Board {
                user_id,
                board_id: id,
            }),
            Self::Board { user_id, board_id } => Some(Self::Status {
                user_id,
                board_id,
                status_id: id,
            }),
            Self::Status {
                user_id,
                board_id,
                status_id,
            } => Some(Self::Ticket {
                user_id,
                board_id,
                status_id,
                ticket_id: id,
            }),
            Self::Ticket { .. } => None,
        }
    }

    /// Same path, different innermost resource (a sibling of the leaf).
    pub fn with_leaf(&self, id: i64) -> OwnershipChain {
        match *self {
            Self::User { .. } => Self::User { user_id: id },
            Self::Board { user_id, .. } => Self::Board {
                user_id,
                board_id: id,
            },
            Self::Status {
                user_id, board_id, ..
            } => Self::Status {
                user_id,
                board_id,
                status_id: id,
            },
            Self::Ticket {
                user_id,
                board_id,
                status_id,
                ..
            } => Self::Ticket {
                user_id,
                board_id,
                status_id,
                ticket_id: id,
            },
        }
    }
}

/// Fields of a child row being appended to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewChild {
    Board {
        title: String,
    },
    Status {
        title: String,
    },
    Ticket {
        title: String,
        description: Option<String>,
        contact: Option<String>,
    },
}

impl NewChild {
    pub fn kind(&self) -> ChildKind {
        match self {
            Self::Board { .. } => ChildKind::Board,
            Self::Status { .. } => ChildKind::Status,
            Self::Ticket { .. } => ChildKind::Ticket,
        }
    }

    #[cfg(test)]
    pub fn title(&self) -> &str {
        match self {
            Self::Board { title } | Self::Status { title } | Self::Ticket { title, .. } => title,
        }
    }
}

/// Non-order field changes. `description`/`contact` only apply to tickets;
/// `Some(None)` clears the column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub contact: Option<Option<String>>,
}

impl ChildPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.contact.is_none()
    }
}

/// Pool-level store operations, used before a transaction opens.
#[async_trait]
pub trait OrderedStore: Send + Sync + 'static {
    type Tx: StoreTx;

    /// Open a transaction. Dropping the returned handle rolls it back.
    async fn begin(&self) -> Result<Self::Tx, BoxError>;

    /// Whether every link of `chain` exists and belongs to its user,
    /// answered by one scoped query.
    async fn verify_chain(&self, chain: &OwnershipChain) -> Result<bool, BoxError>;

    /// Rows of `kind` among `ids` that sit under `scope` and belong to its
    /// user. Ids failing either check are simply absent from the result.
    async fn get_by_ids_with_ownership(
        &self,
        kind: ChildKind,
        ids: &[i64],
        scope: &OwnershipChain,
    ) -> Result<Vec<SiblingRow>, BoxError>;
}

/// Operations inside one open transaction.
#[async_trait]
pub trait StoreTx: Send + Sync {
    /// Lock the parent row of a `kind` collection for the rest of the
    /// transaction. Returns `false` if the parent does not exist.
    async fn lock_parent(&self, kind: ChildKind, parent_id: i64) -> Result<bool, BoxError>;

    /// Children of `parent_id`, ordered by `sort_order` then id.
    async fn list_siblings(&self, kind: ChildKind, parent_id: i64)
    -> Result<Vec<SiblingRow>, BoxError>;

    async fn count_siblings(&self, kind: ChildKind, parent_id: i64) -> Result<i64, BoxError>;

    /// Lock the rows about to be written, in ascending id order.
    async fn lock_rows(&self, kind: ChildKind, ids: &[i64]) -> Result<(), BoxError>;

    async fn find_child(&self, kind: ChildKind, id: i64) -> Result<Option<SiblingRow>, BoxError>;

    /// Insert a new row under `parent_id`, returning its id.
    async fn insert_child(
        &self,
        parent_id: i64,
        sort_order: i32,
        child: &NewChild,
    ) -> Result<i64, BoxError>;

    async fn update_fields(
        &self,
        kind: ChildKind,
        id: i64,
        patch: &ChildPatch,
    ) -> Result<(), BoxError>;

    async fn update_sort_order(
        &self,
        kind: ChildKind,
        id: i64,
        sort_order: i32,
    ) -> Result<(), BoxError>;

    async fn update_sort_order_and_parent(
        &self,
        kind: ChildKind,
        id: i64,
        sort_order: i32,
        parent_id: i64,
    ) -> Result<(), BoxError>;

    async fn commit(self) -> Result<(), BoxError>;
}
