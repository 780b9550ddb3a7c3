use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{Status, StatusCreate, StatusUpdate};
use shared::request::ReorderRequest;

use crate::auth::UserIdentity;
use crate::db::{self, ChildPatch, NewChild};
use crate::error::ServiceError;
use crate::ordering::Movement;
use crate::state::AppState;
use crate::utils::validation;

use super::{ApiResult, apply_update};

async fn load_status(state: &AppState, status_id: i64) -> Result<Status, ServiceError> {
    db::statuses::find_status(&state.pool, status_id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::StatusNotFound,
                format!("status {status_id} not found"),
            )
            .with_detail("ids", vec![status_id])
            .into()
        })
}

pub async fn create_status(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(board_id): Path<i64>,
    Json(data): Json<StatusCreate>,
) -> ApiResult<Status> {
    let title = validation::status_title(&data.title)?;

    let appended = state
        .coordinator
        .append_child(&identity.board(board_id), NewChild::Status { title }, &state.shutdown)
        .await?;

    Ok(Json(load_status(&state, appended.id).await?))
}

pub async fn reorder_statuses(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(board_id): Path<i64>,
    Json(data): Json<ReorderRequest>,
) -> ApiResult<Vec<Status>> {
    state
        .coordinator
        .bulk_reorder(&identity.board(board_id), &data.ordered_ids(), &state.shutdown)
        .await?;

    let statuses = db::statuses::list_statuses(&state.pool, board_id).await?;
    Ok(Json(statuses))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((board_id, status_id)): Path<(i64, i64)>,
    Json(data): Json<StatusUpdate>,
) -> ApiResult<Status> {
    let patch = ChildPatch {
        title: data.title.as_deref().map(validation::status_title).transpose()?,
        ..Default::default()
    };
    let movement = data.sort_order.map(|target| Movement::Within { target });

    apply_update(
        &*state.coordinator,
        &identity.board(board_id),
        status_id,
        patch,
        movement,
        &state.shutdown,
    )
    .await?;

    Ok(Json(load_status(&state, status_id).await?))
}
