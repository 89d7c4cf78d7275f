//! API module - Axum routes

pub mod auth;
pub mod payment;
pub mod subscription;
pub mod tokens;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth::routes())
        .nest("/api/tokens", tokens::routes())
        .nest("/api/subscription", subscription::routes())
        .nest("/api/payment", payment::routes())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": tokengate_core::VERSION,
    }))
}
