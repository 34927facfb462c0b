//! Axum router setup

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;

use crate::{
    ServerState,
    assets::static_handler,
    handlers::{clear_cache, get_cycles, get_tree, health_check, rebuild},
    websocket::ws_handler,
};

pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/health", get(health_check))
        .route("/api/tree", get(get_tree))
        .route("/api/cycles", get(get_cycles))
        .route("/api/rebuild", post(rebuild))
        .route("/api/cache", delete(clear_cache))
        .route("/", get(static_handler))
        .route("/*path", get(static_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
