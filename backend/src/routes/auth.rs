use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use shared::{ApiError, CurrentUserResponse, LoginRequest, LoginResponse, RegisterMechanic, Session};
use std::sync::Arc;

use crate::AppState;

use super::{with_store, AuthUser, Claims, CLEAR_TOKEN_COOKIE};

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let session = match with_store(&state, move |store| {
        store.authenticate(&payload.username, &payload.password)
    })
    .await
    {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let token = match create_jwt(&state.config.jwt_secret, &session) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to create JWT: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::internal_error("Failed to create session")),
            )
                .into_response();
        }
    };

    let cookie = format!(
        "token={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400",
        token
    );
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            token,
            user: current_user(session),
        }),
    )
        .into_response()
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterMechanic>,
) -> Response {
    match with_store(&state, move |store| store.register_mechanic(&payload)).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn logout() -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, CLEAR_TOKEN_COOKIE)],
        Json(shared::LogoutResponse {
            status: "logged out".to_string(),
        }),
    )
        .into_response()
}

pub async fn me(auth_user: AuthUser) -> Json<CurrentUserResponse> {
    Json(current_user(auth_user.session))
}

fn current_user(session: Session) -> CurrentUserResponse {
    CurrentUserResponse {
        user_id: session.user_id,
        username: session.username,
        full_name: session.full_name,
        role: session.role,
    }
}

fn create_jwt(secret: &str, session: &Session) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::hours(24);

    let claims = Claims {
        sub: session.username.clone(),
        name: session.full_name.clone(),
        user_id: session.user_id,
        role: session.role,
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
