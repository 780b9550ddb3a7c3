use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{Board, BoardCreate, BoardDetail, BoardUpdate};
use shared::request::ReorderRequest;

use crate::auth::UserIdentity;
use crate::db::{self, ChildPatch, NewChild};
use crate::error::ServiceError;
use crate::ordering::Movement;
use crate::state::AppState;
use crate::utils::validation;

use super::{ApiResult, apply_update};

pub(super) fn board_not_found(board_id: i64) -> AppError {
    AppError::with_message(ErrorCode::BoardNotFound, format!("board {board_id} not found"))
        .with_detail("ids", vec![board_id])
}

async fn load_board(state: &AppState, user_id: i64, board_id: i64) -> Result<Board, ServiceError> {
    db::boards::find_board(&state.pool, user_id, board_id)
        .await?
        .ok_or_else(|| board_not_found(board_id).into())
}

/// Board with every status and ticket, each level in sort order.
pub(super) async fn load_board_detail(
    state: &AppState,
    user_id: i64,
    board_id: i64,
) -> Result<BoardDetail, ServiceError> {
    let board = load_board(state, user_id, board_id).await?;
    let (statuses, tickets) = tokio::try_join!(
        db::statuses::list_statuses(&state.pool, board_id),
        db::tickets::list_board_tickets(&state.pool, board_id),
    )?;
    Ok(BoardDetail::assemble(board, statuses, tickets))
}

pub async fn list_boards(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Vec<Board>> {
    let boards = db::boards::list_boards(&state.pool, identity.user_id).await?;
    Ok(Json(boards))
}

pub async fn create_board(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(data): Json<BoardCreate>,
) -> ApiResult<Board> {
    let title = validation::title(&data.title)?;

    let appended = state
        .coordinator
        .append_child(&identity.chain(), NewChild::Board { title }, &state.shutdown)
        .await?;

    Ok(Json(load_board(&state, identity.user_id, appended.id).await?))
}

pub async fn reorder_boards(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(data): Json<ReorderRequest>,
) -> ApiResult<Vec<Board>> {
    state
        .coordinator
        .bulk_reorder(&identity.chain(), &data.ordered_ids(), &state.shutdown)
        .await?;

    let boards = db::boards::list_boards(&state.pool, identity.user_id).await?;
    Ok(Json(boards))
}

pub async fn get_board(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(board_id): Path<i64>,
) -> ApiResult<BoardDetail> {
    Ok(Json(
        load_board_detail(&state, identity.user_id, board_id).await?,
    ))
}

pub async fn update_board(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(board_id): Path<i64>,
    Json(data): Json<BoardUpdate>,
) -> ApiResult<Board> {
    let patch = ChildPatch {
        title: data.title.as_deref().map(validation::title).transpose()?,
        ..Default::default()
    };
    let movement = data.sort_order.map(|target| Movement::Within { target });

    apply_update(
        &*state.coordinator,
        &identity.chain(),
        board_id,
        patch,
        movement,
        &state.shutdown,
    )
    .await?;

    Ok(Json(load_board(&state, identity.user_id, board_id).await?))
}
