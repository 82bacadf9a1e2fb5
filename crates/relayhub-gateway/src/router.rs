//! Axum router wiring for the hub.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, cors, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(transport::ws::ws_upgrade))
        .route("/health", get(ops::health))
        .route("/api/messages", get(ops::messages))
        .route("/api/unread", get(ops::unread))
        .route("/api/users", get(ops::users))
        .route("/api/admin/delete", post(ops::admin_delete))
        .layer(cors::layer())
        .with_state(state)
}
