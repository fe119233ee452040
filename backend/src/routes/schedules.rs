use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shared::{ChangeScheduleStatus, CreateSchedule, UpdateSchedule};
use std::sync::Arc;

use crate::AppState;

use super::{with_store, AuthUser};

#[derive(Deserialize)]
pub struct ListSchedulesParams {
    pub mechanic: Option<String>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSchedulesParams>,
    auth: AuthUser,
) -> Response {
    match with_store(&state, move |store| {
        store.list_schedules(&auth.session, params.mechanic.as_deref())
    })
    .await
    {
        Ok(entries) => Json(entries).into_response(),
        Err(resp) => resp,
    }
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<CreateSchedule>,
) -> Response {
    match with_store(&state, move |store| store.add_schedule(&auth.session, &payload)).await {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    auth: AuthUser,
    Json(payload): Json<UpdateSchedule>,
) -> Response {
    match with_store(&state, move |store| {
        store.edit_schedule(&auth.session, id, &payload)
    })
    .await
    {
        Ok(entry) => Json(entry).into_response(),
        Err(resp) => resp,
    }
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    auth: AuthUser,
) -> Response {
    match with_store(&state, move |store| store.delete_schedule(&auth.session, id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(resp) => resp,
    }
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    auth: AuthUser,
    Json(payload): Json<ChangeScheduleStatus>,
) -> Response {
    match with_store(&state, move |store| {
        store.set_schedule_status(&auth.session, id, payload.status)
    })
    .await
    {
        Ok(entry) => Json(entry).into_response(),
        Err(resp) => resp,
    }
}
