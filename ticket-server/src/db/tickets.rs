//! Ticket read queries

use shared::models::Ticket;
use sqlx::PgPool;

use super::BoxError;

/// All tickets on a board, ordered by status position then ticket position.
pub async fn list_board_tickets(pool: &PgPool, board_id: i64) -> Result<Vec<Ticket>, BoxError> {
    let rows = sqlx::query_as::<_, Ticket>(
        r#"
        SELECT t.id, t.status_id, t.title, t.description, t.contact,
               t.sort_order, t.created_at, t.updated_at
        FROM tickets t
        JOIN statuses s ON s.id = t.status_id
        WHERE s.board_id = $1
        ORDER BY s.sort_order, s.id, t.sort_order, t.id
        "#,
    )
    .bind(board_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_status_tickets(pool: &PgPool, status_id: i64) -> Result<Vec<Ticket>, BoxError> {
    let rows = sqlx::query_as::<_, Ticket>(
        r#"
        SELECT id, status_id, title, description, contact, sort_order, created_at, updated_at
        FROM tickets
        WHERE status_id = $1
        ORDER BY sort_order, id
        "#,
    )
    .bind(status_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_ticket(pool: &PgPool, ticket_id: i64) -> Result<Option<Ticket>, BoxError> {
    let row = sqlx::query_as::<_, Ticket>(
        r#"
        SELECT id, status_id, title, description, contact, sort_order, created_at, updated_at
        FROM tickets
        WHERE id = $1
        "#,
    )
    .bind(ticket_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
