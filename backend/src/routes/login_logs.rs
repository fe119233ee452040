use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;

use super::{with_store, AuthUser};

#[derive(Deserialize)]
pub struct LoginLogParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoginLogParams>,
    auth: AuthUser,
) -> Response {
    match with_store(&state, move |store| store.login_logs(&auth.session, params.limit)).await {
        Ok(logs) => Json(logs).into_response(),
        Err(resp) => resp,
    }
}
