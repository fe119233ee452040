use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::CreateCustomer;
use std::sync::Arc;

use crate::AppState;

use super::{with_store, AuthUser};

pub async fn list(State(state): State<Arc<AppState>>, _auth: AuthUser) -> Response {
    match with_store(&state, move |store| store.list_customers()).await {
        Ok(customers) => Json(customers).into_response(),
        Err(resp) => resp,
    }
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(payload): Json<CreateCustomer>,
) -> Response {
    match with_store(&state, move |store| store.add_customer(&auth.session, &payload)).await {
        Ok(customer) => (StatusCode::CREATED, Json(customer)).into_response(),
        Err(resp) => resp,
    }
}
