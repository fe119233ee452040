pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use error::{GarageError, GarageResult};
pub use store::{Store, StoreOptions};

use routes::{
    auth, calendar, customers, health, inventory, login_logs, mechanics, repairs, schedules,
};

pub struct AppState {
    pub store: Mutex<Store>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: Store, config: AppConfig) -> Self {
        Self {
            store: Mutex::new(store),
            config,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth routes
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // Customer intake
        .route("/api/customers", get(customers::list).post(customers::create))
        // Repair tickets
        .route("/api/repairs", get(repairs::list))
        .route("/api/repairs/:id", get(repairs::get).patch(repairs::update))
        .route("/api/repairs/:id/notes", put(repairs::notes))
        .route("/api/repairs/:id/status", post(repairs::change_status))
        // Inventory
        .route("/api/inventory", get(inventory::list).post(inventory::create))
        .route("/api/inventory/restock", post(inventory::restock))
        .route("/api/inventory/:part/order", post(inventory::order))
        .route("/api/inventory/:part/ship", post(inventory::ship))
        // Mechanics
        .route("/api/mechanics", get(mechanics::list).post(mechanics::create))
        .route(
            "/api/mechanics/:username",
            axum::routing::delete(mechanics::remove),
        )
        // Schedules
        .route("/api/schedules", get(schedules::list).post(schedules::create))
        .route(
            "/api/schedules/:id",
            axum::routing::patch(schedules::update).delete(schedules::remove),
        )
        .route("/api/schedules/:id/status", post(schedules::change_status))
        // Calendar
        .route("/api/calendar", get(calendar::month))
        // Login history
        .route("/api/login-logs", get(login_logs::list))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
