use axum::{extract::State, Json};
use shared::HealthResponse;
use std::sync::Arc;

use crate::AppState;

/// Liveness check. Reports `degraded` once a panic has poisoned the store lock.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = if state.store.is_poisoned() {
        "degraded"
    } else {
        "ok"
    };
    Json(HealthResponse {
        status: status.to_string(),
    })
}
