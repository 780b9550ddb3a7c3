//! Status read queries

use shared::models::Status;
use sqlx::PgPool;

use super::BoxError;

pub async fn list_statuses(pool: &PgPool, board_id: i64) -> Result<Vec<Status>, BoxError> {
    let rows = sqlx::query_as::<_, Status>(
        r#"
        SELECT id, board_id, title, sort_order, created_at, updated_at
        FROM statuses
        WHERE board_id = $1
        ORDER BY sort_order, id
        "#,
    )
    .bind(board_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_status(pool: &PgPool, status_id: i64) -> Result<Option<Status>, BoxError> {
    let row = sqlx::query_as::<_, Status>(
        "SELECT id, board_id, title, sort_order, created_at, updated_at FROM statuses WHERE id = $1",
    )
    .bind(status_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
