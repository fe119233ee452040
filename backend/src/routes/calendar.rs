use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Deserialize;
use shared::MonthRange;
use std::sync::Arc;

use crate::AppState;

use super::{with_store, AuthUser};

#[derive(Deserialize)]
pub struct CalendarParams {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub mechanic: Option<String>,
}

/// Month view; defaults to the current month.
pub async fn month(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CalendarParams>,
    auth: AuthUser,
) -> Response {
    let now = Local::now().naive_local();
    let current = MonthRange::containing(now.date());
    let year = params.year.unwrap_or(current.year);
    let month = params.month.unwrap_or(current.month);

    match with_store(&state, move |store| {
        store.month_calendar(&auth.session, year, month, params.mechanic.as_deref(), now)
    })
    .await
    {
        Ok(calendar) => Json(calendar).into_response(),
        Err(resp) => resp,
    }
}
