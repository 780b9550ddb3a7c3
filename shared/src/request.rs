//! Reorder request payloads

use serde::{Deserialize, Serialize};

/// One entry of a bulk reorder request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderItem {
    pub id: i64,
}

/// Complete ordered list of the children of one parent.
///
/// Position in `items` becomes the new 1-based `sort_order`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub items: Vec<ReorderItem>,
}

impl ReorderRequest {
    pub fn ordered_ids(&self) -> Vec<i64> {
        self.items.iter().map(|i| i.id).collect()
    }
}

/// Final ticket membership and order for one status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTickets {
    pub status_id: i64,
    pub ticket_ids: Vec<i64>,
}

/// Move whole sets of tickets across the statuses of one board
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkTicketReorderRequest {
    pub statuses: Vec<StatusTickets>,
}
