//! Status Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ticket::Ticket;

/// Status (board column), ordered among the statuses of one board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Status {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create status payload (appended after the board's last status)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCreate {
    pub title: String,
}

/// Update status payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub title: Option<String>,
    /// Target position among the board's statuses
    pub sort_order: Option<i32>,
}

/// Status with its tickets in sort order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDetail {
    #[serde(flatten)]
    pub status: Status,
    pub tickets: Vec<Ticket>,
}
