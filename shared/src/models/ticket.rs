//! Ticket Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::text;

/// Ticket (card), ordered among the tickets of one status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Ticket {
    pub id: i64,
    pub status_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub contact: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create ticket payload (appended after the status's last ticket)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketCreate {
    pub title: String,
    #[serde(default, deserialize_with = "text::deserialize_optional")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "text::deserialize_optional")]
    pub contact: Option<String>,
}

/// Update ticket payload
///
/// `description` / `contact`: absent keeps the stored value, `null` or `""`
/// clears it. `status_id` different from the current status moves the ticket
/// and then requires `sort_order`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketUpdate {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text::deserialize_patch")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "text::deserialize_patch")]
    pub contact: Option<Option<String>>,
    pub sort_order: Option<i32>,
    pub status_id: Option<i64>,
}
