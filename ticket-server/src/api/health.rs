//! Health check endpoint

use axum::Json;
use axum::extract::State;
use http::StatusCode;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let database_up = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let status = if database_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if database_up { "ok" } else { "degraded" },
            "service": "ticket-server",
            "version": env!("CARGO_PKG_VERSION"),
            "database": if database_up { "up" } else { "down" },
        })),
    )
}
