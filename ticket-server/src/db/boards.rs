//! Board read queries

use shared::models::Board;
use sqlx::PgPool;

use super::BoxError;

const BOARD_COLUMNS: &str = "id, user_id, title, sort_order, created_at, updated_at";

pub async fn list_boards(pool: &PgPool, user_id: i64) -> Result<Vec<Board>, BoxError> {
    let sql = format!(
        "SELECT {BOARD_COLUMNS} FROM boards WHERE user_id = $1 ORDER BY sort_order, id"
    );
    let rows = sqlx::query_as::<_, Board>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_board(
    pool: &PgPool,
    user_id: i64,
    board_id: i64,
) -> Result<Option<Board>, BoxError> {
    let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = $1 AND user_id = $2");
    let row = sqlx::query_as::<_, Board>(&sql)
        .bind(board_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}
