//! Auth API routes

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use tokengate_core::services::accounts;
use tokengate_core::{LoginRequest, RegisterRequest};

use crate::error::ApiResult;
use crate::AppState;

/// Auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Register a new user on the free plan
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let free_plan = state.entitlements.catalog().free_plan();
    let today = state.entitlements.day_boundary().today();

    let user = accounts::register_user(state.users.as_ref(), req, free_plan, today).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Login with username and password
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.clone();
    let token = accounts::login(state.users.as_ref(), state.tokens.as_ref(), req).await?;

    // Accounts created before entitlements existed get their defaults here
    let user = accounts::find_user(state.users.as_ref(), &username).await?;
    if state.entitlements.ensure_entitlement(&user.id).await? {
        log::info!("[api:auth] Backfilled entitlement for {}", username);
    }

    Ok(Json(token))
}
