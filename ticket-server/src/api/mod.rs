//! HTTP routes for ticket-server
//!
//! Every route except `/health` requires a user JWT. Handlers validate the
//! payload, hand the mutation to the reorder coordinator with the caller's
//! ownership chain, then re-read the affected rows for the response.

pub mod boards;
pub mod health;
pub mod statuses;
pub mod tickets;

use std::time::Duration;

use axum::routing::{get, patch, post, put};
use axum::{Json, Router, middleware};
use http::{HeaderName, HeaderValue, StatusCode};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::user_auth::user_auth_middleware;
use crate::db::{ChildPatch, OrderedStore, OwnershipChain};
use crate::error::ServiceError;
use crate::ordering::{Movement, OrderingError, ReorderCoordinator};
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, ServiceError>;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Apply a PATCH body: pure moves go to the dedicated move operations,
/// anything carrying field changes goes through `update_child`.
async fn apply_update<S: OrderedStore>(
    coordinator: &ReorderCoordinator<S>,
    parent: &OwnershipChain,
    child_id: i64,
    patch: ChildPatch,
    movement: Option<Movement>,
    cancel: &CancellationToken,
) -> Result<(), OrderingError> {
    let outcome = match movement {
        Some(Movement::Within { target }) if patch.is_empty() => {
            coordinator
                .move_within_parent(parent, child_id, target, cancel)
                .await?
        }
        Some(Movement::Across {
            new_parent_id,
            target: Some(target),
        }) if patch.is_empty() => {
            coordinator
                .move_across_parents(parent, new_parent_id, child_id, target, cancel)
                .await?
        }
        movement => {
            coordinator
                .update_child(parent, child_id, patch, movement, cancel)
                .await?
        }
    };
    tracing::debug!(child_id, writes = outcome.writes.len(), "update applied");
    Ok(())
}

/// Create the application router
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let boards = Router::new()
        .route("/boards", get(boards::list_boards).post(boards::create_board))
        .route("/boards/sort-orders", put(boards::reorder_boards))
        .route(
            "/boards/{board_id}",
            get(boards::get_board).patch(boards::update_board),
        );

    let statuses = Router::new()
        .route("/boards/{board_id}/statuses", post(statuses::create_status))
        .route(
            "/boards/{board_id}/statuses/sort-orders",
            put(statuses::reorder_statuses),
        )
        .route(
            "/boards/{board_id}/statuses/{status_id}",
            patch(statuses::update_status),
        );

    let tickets = Router::new()
        .route(
            "/boards/{board_id}/statuses/tickets/bulk-reorder",
            put(tickets::bulk_reorder_tickets),
        )
        .route(
            "/boards/{board_id}/statuses/{status_id}/tickets",
            post(tickets::create_ticket),
        )
        .route(
            "/boards/{board_id}/statuses/{status_id}/tickets/sort-orders",
            put(tickets::reorder_tickets),
        )
        .route(
            "/boards/{board_id}/statuses/{status_id}/tickets/{ticket_id}",
            patch(tickets::update_ticket),
        );

    let protected = Router::new()
        .merge(boards)
        .merge(statuses)
        .merge(tickets)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            user_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(protected)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            request_timeout,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .with_state(state)
}
