//! Board Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{Status, StatusDetail};
use super::ticket::Ticket;

/// Board entity, ordered among the boards of one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Board {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create board payload (appended after the user's last board)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardCreate {
    pub title: String,
}

/// Update board payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardUpdate {
    pub title: Option<String>,
    /// Target position among the user's boards
    pub sort_order: Option<i32>,
}

/// Board with its statuses and their tickets, all in sort order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub statuses: Vec<StatusDetail>,
}

impl BoardDetail {
    /// Group `tickets` under their statuses. Both inputs are expected in
    /// sort order; tickets whose status is not in `statuses` are dropped.
    pub fn assemble(board: Board, statuses: Vec<Status>, tickets: Vec<Ticket>) -> Self {
        let mut details: Vec<StatusDetail> = statuses
            .into_iter()
            .map(|status| StatusDetail {
                status,
                tickets: Vec::new(),
            })
            .collect();

        for ticket in tickets {
            if let Some(detail) = details.iter_mut().find(|d| d.status.id == ticket.status_id) {
                detail.tickets.push(ticket);
            }
        }

        Self {
            board,
            statuses: details,
        }
    }
}
