use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{BoardDetail, Ticket, TicketCreate, TicketUpdate};
use shared::request::{BulkTicketReorderRequest, ReorderRequest};

use crate::auth::UserIdentity;
use crate::db::{self, ChildPatch, NewChild};
use crate::error::ServiceError;
use crate::ordering::{Movement, ParentGroup};
use crate::state::AppState;
use crate::utils::validation::{self, MAX_CONTACT_LEN, MAX_DESCRIPTION_LEN, validate_optional_text};

use super::boards::load_board_detail;
use super::{ApiResult, apply_update};

async fn load_ticket(state: &AppState, ticket_id: i64) -> Result<Ticket, ServiceError> {
    db::tickets::find_ticket(&state.pool, ticket_id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::TicketNotFound,
                format!("ticket {ticket_id} not found"),
            )
            .with_detail("ids", vec![ticket_id])
            .into()
        })
}

/// Position change requested by a ticket update.
///
/// `status_id` alone (or equal to the current status without `sort_order`)
/// is left to the coordinator, which rejects a cross-status move without a
/// target.
fn movement(data: &TicketUpdate) -> Option<Movement> {
    match (data.status_id, data.sort_order) {
        (Some(new_parent_id), target) => Some(Movement::Across {
            new_parent_id,
            target,
        }),
        (None, Some(target)) => Some(Movement::Within { target }),
        (None, None) => None,
    }
}

pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((board_id, status_id)): Path<(i64, i64)>,
    Json(data): Json<TicketCreate>,
) -> ApiResult<Ticket> {
    let title = validation::title(&data.title)?;
    validate_optional_text(data.description.as_deref(), "description", MAX_DESCRIPTION_LEN)?;
    validate_optional_text(data.contact.as_deref(), "contact", MAX_CONTACT_LEN)?;

    let child = NewChild::Ticket {
        title,
        description: data.description,
        contact: data.contact,
    };
    let appended = state
        .coordinator
        .append_child(&identity.status(board_id, status_id), child, &state.shutdown)
        .await?;

    Ok(Json(load_ticket(&state, appended.id).await?))
}

pub async fn reorder_tickets(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((board_id, status_id)): Path<(i64, i64)>,
    Json(data): Json<ReorderRequest>,
) -> ApiResult<Vec<Ticket>> {
    state
        .coordinator
        .bulk_reorder(
            &identity.status(board_id, status_id),
            &data.ordered_ids(),
            &state.shutdown,
        )
        .await?;

    let tickets = db::tickets::list_status_tickets(&state.pool, status_id).await?;
    Ok(Json(tickets))
}

pub async fn bulk_reorder_tickets(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(board_id): Path<i64>,
    Json(data): Json<BulkTicketReorderRequest>,
) -> ApiResult<BoardDetail> {
    let groups: Vec<ParentGroup> = data
        .statuses
        .into_iter()
        .map(|s| ParentGroup {
            parent_id: s.status_id,
            child_ids: s.ticket_ids,
        })
        .collect();

    state
        .coordinator
        .bulk_cross_parent_reorder(&identity.board(board_id), &groups, &state.shutdown)
        .await?;

    Ok(Json(
        load_board_detail(&state, identity.user_id, board_id).await?,
    ))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((board_id, status_id, ticket_id)): Path<(i64, i64, i64)>,
    Json(data): Json<TicketUpdate>,
) -> ApiResult<Ticket> {
    validate_optional_text(
        data.description.as_ref().and_then(|d| d.as_deref()),
        "description",
        MAX_DESCRIPTION_LEN,
    )?;
    validate_optional_text(
        data.contact.as_ref().and_then(|c| c.as_deref()),
        "contact",
        MAX_CONTACT_LEN,
    )?;
    let movement = movement(&data);
    let patch = ChildPatch {
        title: data.title.as_deref().map(validation::title).transpose()?,
        description: data.description,
        contact: data.contact,
    };

    apply_update(
        &*state.coordinator,
        &identity.status(board_id, status_id),
        ticket_id,
        patch,
        movement,
        &state.shutdown,
    )
    .await?;

    Ok(Json(load_ticket(&state, ticket_id).await?))
}
