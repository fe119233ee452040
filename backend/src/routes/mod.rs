pub mod auth;
pub mod calendar;
pub mod customers;
pub mod health;
pub mod inventory;
pub mod login_logs;
pub mod mechanics;
pub mod repairs;
pub mod schedules;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::{ApiError, Role, Session};
use std::sync::Arc;

use crate::error::{GarageError, GarageResult};
use crate::store::Store;
use crate::AppState;

const CLEAR_TOKEN_COOKIE: &str = "token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub name: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

pub struct AuthUser {
    pub session: Session,
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::internal_error(message)),
    )
        .into_response()
}

/// Run one store operation under the lock on the blocking pool and turn its
/// error into a response. SQLite calls and bcrypt never run on a runtime
/// worker, and neither does waiting for the lock.
pub(crate) async fn with_store<T, F>(state: &Arc<AppState>, op: F) -> Result<T, Response>
where
    F: FnOnce(&mut Store) -> GarageResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || {
        let mut store = state.store.lock().map_err(|_| {
            tracing::error!("store lock poisoned");
            internal_error("Database unavailable")
        })?;
        op(&mut store).map_err(error_response)
    })
    .await
    .map_err(|err| {
        tracing::error!("store task failed: {err}");
        internal_error("Internal server error")
    })?
}

pub(crate) fn error_response(err: GarageError) -> Response {
    match err {
        GarageError::Validation(msg) => {
            (StatusCode::BAD_REQUEST, Json(ApiError::validation_error(msg))).into_response()
        }
        GarageError::Conflict(msg) => {
            (StatusCode::CONFLICT, Json(ApiError::conflict(msg))).into_response()
        }
        GarageError::NotFound(msg) => {
            (StatusCode::NOT_FOUND, Json(ApiError::not_found(msg))).into_response()
        }
        GarageError::Forbidden(msg) => {
            (StatusCode::FORBIDDEN, Json(ApiError::forbidden(msg))).into_response()
        }
        GarageError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::unauthorized("Invalid username or password")),
        )
            .into_response(),
        other => {
            tracing::error!("request failed: {other}");
            internal_error("Internal server error")
        }
    }
}

fn rejected_token(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::SET_COOKIE, CLEAR_TOKEN_COOKIE)],
        Json(ApiError::unauthorized(message)),
    )
        .into_response()
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Try to get token from cookie
        let cookie_header = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let token = cookie_header
            .split(';')
            .find_map(|cookie| cookie.trim().strip_prefix("token="))
            .filter(|t| !t.is_empty())
            .or_else(|| {
                // Fallback to Authorization header
                parts
                    .headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
            });

        let token = match token {
            Some(t) => t,
            None if state.config.dev_mode => {
                // Dev mode: unauthenticated requests act as the administrator
                let session = with_store(state, |store| store.session_for("admin")).await?;
                return Ok(AuthUser { session });
            }
            None => {
                return Err((
                    StatusCode::UNAUTHORIZED,
                    Json(ApiError::unauthorized("Missing authentication token")),
                )
                    .into_response())
            }
        };

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| rejected_token("Invalid or expired token"))?;

        // The account may have been removed or replaced since the token was issued.
        let claims = token_data.claims;
        let username = claims.sub.clone();
        let account = with_store(state, move |store| match store.session_for(&username) {
            Ok(session) => Ok(Some(session)),
            Err(GarageError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        })
        .await?;

        match account {
            Some(session) if session.user_id == claims.user_id => Ok(AuthUser { session }),
            _ => {
                tracing::info!(username = %claims.sub, "rejected token for a removed account");
                Err(rejected_token("Account no longer exists"))
            }
        }
    }
}
