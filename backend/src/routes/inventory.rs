use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::{CreatePart, RestockRequest, RestockResponse, StockChange};
use std::sync::Arc;

use crate::store::{DEFAULT_RESTOCK_AMOUNT, DEFAULT_RESTOCK_THRESHOLD};
use crate::AppState;

use super::{with_store, AuthUser};

pub async fn list(State(state): State<Arc<AppState>>, _auth: AuthUser) -> Response {
    match with_store(&state, move |store| store.list_parts()).await {
        Ok(parts) => Json(parts).into_response(),
        Err(resp) => resp,
    }
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<CreatePart>,
) -> Response {
    match with_store(&state, move |store| store.add_part(&auth.session, &payload)).await {
        Ok(part) => (StatusCode::CREATED, Json(part)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn order(
    State(state): State<Arc<AppState>>,
    Path(part): Path<String>,
    auth: AuthUser,
    Json(payload): Json<StockChange>,
) -> Response {
    match with_store(&state, move |store| {
        store.order_part(&auth.session, &part, payload.quantity)
    })
    .await
    {
        Ok(part) => Json(part).into_response(),
        Err(resp) => resp,
    }
}

pub async fn ship(
    State(state): State<Arc<AppState>>,
    Path(part): Path<String>,
    auth: AuthUser,
    Json(payload): Json<StockChange>,
) -> Response {
    match with_store(&state, move |store| {
        store.ship_part(&auth.session, &part, payload.quantity)
    })
    .await
    {
        Ok(part) => Json(part).into_response(),
        Err(resp) => resp,
    }
}

pub async fn restock(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<RestockRequest>,
) -> Response {
    let threshold = payload.threshold.unwrap_or(DEFAULT_RESTOCK_THRESHOLD);
    let amount = payload.amount.unwrap_or(DEFAULT_RESTOCK_AMOUNT);
    match with_store(&state, move |store| {
        store.restock_low(&auth.session, threshold, amount)
    })
    .await
    {
        Ok(restocked) => Json(RestockResponse { restocked }).into_response(),
        Err(resp) => resp,
    }
}
