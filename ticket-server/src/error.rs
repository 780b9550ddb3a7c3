//! Unified service-layer error type for ticket-server
//!
//! `ServiceError` bridges DB-layer errors (`sqlx::Error`, `BoxError`) and
//! ordering errors to the API-layer `AppError`, so handlers can use `?`
//! throughout.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::db::{BoxError, ChildKind};
use crate::ordering::OrderingError;

/// Service-layer error.
///
/// - `Db`: database/infrastructure errors (logged, mapped to InternalError)
/// - `App`: business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<OrderingError> for ServiceError {
    fn from(e: OrderingError) -> Self {
        match e {
            OrderingError::Store(db_err) => ServiceError::Db(db_err),
            other => ServiceError::App(other.into()),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

fn not_found_code(kind: ChildKind) -> ErrorCode {
    match kind {
        ChildKind::Board => ErrorCode::BoardNotFound,
        ChildKind::Status => ErrorCode::StatusNotFound,
        ChildKind::Ticket => ErrorCode::TicketNotFound,
    }
}

impl From<OrderingError> for AppError {
    fn from(e: OrderingError) -> Self {
        let message = e.to_string();
        match e {
            OrderingError::Invalid(_) => AppError::validation(message),
            OrderingError::DuplicateId { id, .. } => {
                AppError::with_message(ErrorCode::DuplicateId, message).with_detail("id", id)
            }
            OrderingError::MissingTarget { .. } => {
                AppError::with_message(ErrorCode::TargetPositionRequired, message)
            }
            OrderingError::OutOfRange { value, min, max, .. } => {
                AppError::with_message(ErrorCode::ValueOutOfRange, message)
                    .with_detail("value", value)
                    .with_detail("min", min)
                    .with_detail("max", max)
            }
            OrderingError::NotFound {
                kind,
                ids,
                parent_id,
            } => {
                let err =
                    AppError::with_message(not_found_code(kind), message).with_detail("ids", ids);
                match parent_id {
                    Some(parent_id) => err.with_detail("parent_id", parent_id),
                    None => err,
                }
            }
            OrderingError::UnknownOwner { .. } => AppError::not_authenticated(),
            OrderingError::Conflict(_) => AppError::conflict(message),
            OrderingError::Invariant { .. } => {
                tracing::error!(error = %message, "Reorder plan rejected");
                AppError::new(ErrorCode::InternalError)
            }
            OrderingError::Store(db_err) => {
                tracing::error!(error = %db_err, "Reorder store error");
                AppError::new(ErrorCode::InternalError)
            }
            OrderingError::Cancelled => AppError::timeout(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_ordering_error_status_mapping() {
        let cases = vec![
            (OrderingError::Invalid("bad".into()), StatusCode::BAD_REQUEST),
            (
                OrderingError::DuplicateId {
                    kind: ChildKind::Ticket,
                    id: 1,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                OrderingError::MissingTarget {
                    kind: ChildKind::Ticket,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                OrderingError::OutOfRange {
                    kind: ChildKind::Status,
                    value: 9,
                    min: 1,
                    max: 3,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                OrderingError::not_found(ChildKind::Board, 4, None),
                StatusCode::NOT_FOUND,
            ),
            (OrderingError::Conflict("moved".into()), StatusCode::CONFLICT),
            (OrderingError::Store("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (OrderingError::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
            (
                OrderingError::UnknownOwner { user_id: 1 },
                StatusCode::UNAUTHORIZED,
            ),
        ];
        for (err, status) in cases {
            let app: AppError = err.into();
            assert_eq!(app.http_status(), status, "{:?}", app.code);
        }
    }

    #[test]
    fn test_not_found_carries_ids_and_parent() {
        let err = OrderingError::NotFound {
            kind: ChildKind::Ticket,
            ids: vec![7, 8],
            parent_id: Some(3),
        };
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::TicketNotFound);
        let details = app.details.unwrap();
        assert_eq!(details["ids"], serde_json::json!([7, 8]));
        assert_eq!(details["parent_id"], serde_json::json!(3));
    }

    #[test]
    fn test_store_error_becomes_db_variant() {
        let err: ServiceError = OrderingError::Store("boom".into()).into();
        assert!(matches!(err, ServiceError::Db(_)));
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::InternalError);
    }
}
