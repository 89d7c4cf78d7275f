//! Subscription plan routes

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokengate_core::TransitionOutcome;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

/// Subscription routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/plans", get(plans))
        .route("/upgrade", post(upgrade))
        .route("/downgrade", post(downgrade))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    pub plan_id: String,
    pub payment_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DowngradeRequest {
    #[serde(default)]
    pub plan_id: Option<String>,
}

/// Public plan listing
async fn plans(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "plans": state.entitlements.plans() }))
}

async fn upgrade(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<UpgradeRequest>,
) -> ApiResult<Json<TransitionOutcome>> {
    let outcome = state
        .entitlements
        .upgrade(&user_id, &req.plan_id, &req.payment_id)
        .await?;
    Ok(Json(outcome))
}

async fn downgrade(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Option<Json<DowngradeRequest>>,
) -> ApiResult<Json<TransitionOutcome>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let outcome = state
        .entitlements
        .downgrade(&user_id, req.plan_id.as_deref())
        .await?;
    Ok(Json(outcome))
}
