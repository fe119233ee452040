use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use shared::{ChangeRepairStatus, RepairNotes, UpdateRepair};
use std::sync::Arc;

use crate::AppState;

use super::{with_store, AuthUser};

pub async fn list(State(state): State<Arc<AppState>>, auth: AuthUser) -> Response {
    match with_store(&state, move |store| store.list_repairs(&auth.session)).await {
        Ok(repairs) => Json(repairs).into_response(),
        Err(resp) => resp,
    }
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    auth: AuthUser,
) -> Response {
    match with_store(&state, move |store| store.repair(&auth.session, id)).await {
        Ok(repair) => Json(repair).into_response(),
        Err(resp) => resp,
    }
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    auth: AuthUser,
    Json(payload): Json<UpdateRepair>,
) -> Response {
    match with_store(&state, move |store| store.edit_repair(&auth.session, id, &payload)).await {
        Ok(repair) => Json(repair).into_response(),
        Err(resp) => resp,
    }
}

pub async fn notes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    auth: AuthUser,
    Json(payload): Json<RepairNotes>,
) -> Response {
    match with_store(&state, move |store| {
        store.update_repair_notes(&auth.session, id, &payload.notes)
    })
    .await
    {
        Ok(repair) => Json(repair).into_response(),
        Err(resp) => resp,
    }
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    auth: AuthUser,
    Json(payload): Json<ChangeRepairStatus>,
) -> Response {
    match with_store(&state, move |store| {
        store.set_repair_status(&auth.session, id, payload.status)
    })
    .await
    {
        Ok(repair) => Json(repair).into_response(),
        Err(resp) => resp,
    }
}
