use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::CreateMechanic;
use std::sync::Arc;

use crate::AppState;

use super::{with_store, AuthUser};

pub async fn list(State(state): State<Arc<AppState>>, _auth: AuthUser) -> Response {
    match with_store(&state, move |store| store.list_mechanics()).await {
        Ok(mechanics) => Json(mechanics).into_response(),
        Err(resp) => resp,
    }
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<CreateMechanic>,
) -> Response {
    match with_store(&state, move |store| store.add_mechanic(&auth.session, &payload)).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    auth: AuthUser,
) -> Response {
    match with_store(&state, move |store| store.remove_mechanic(&auth.session, &username)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(resp) => resp,
    }
}
