//! Payment checkout routes

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokengate_core::services::entitlement::GatewayOrder;
use tokengate_core::Error;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

/// Payment routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/verify", post(verify))
        .route("/cancel", post(cancel))
        .route("/history", get(history))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub plan_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub plan_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub order_id: String,
}

/// Open a gateway order and a pending checkout
async fn create_order(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<Json<GatewayOrder>> {
    let order = state.entitlements.create_order(&user_id, &req.plan_id).await?;
    log::info!("[api:payment] Order {} opened for user {}", order.order_id, user_id);
    Ok(Json(order))
}

/// Checkout callback: signature check, then the upgrade keyed by order id
async fn verify(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<Value>> {
    if !state
        .entitlements
        .gateway()
        .verify_signature(&req.order_id, &req.payment_id, &req.signature)
    {
        log::warn!("[api:payment] Bad signature for order {} (user {})", req.order_id, user_id);
        return Err(Error::validation("Payment verification failed").into());
    }

    let outcome = state
        .entitlements
        .upgrade(&user_id, &req.plan_id, &req.order_id)
        .await?;

    Ok(Json(json!({
        "success": outcome.success,
        "plan": outcome.plan,
        "applied": outcome.applied,
        "orderId": req.order_id,
        "paymentId": req.payment_id,
    })))
}

/// Abandon a pending checkout
async fn cancel(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CancelRequest>,
) -> ApiResult<Json<Value>> {
    if !state.entitlements.fail_checkout(&user_id, &req.order_id).await? {
        return Err(Error::not_found(format!("No pending order {}", req.order_id)).into());
    }
    Ok(Json(json!({ "success": true, "orderId": req.order_id })))
}

async fn history(State(state): State<AppState>, AuthUser(user_id): AuthUser) -> ApiResult<Json<Value>> {
    let payments = state.entitlements.payment_history(&user_id).await?;
    Ok(Json(json!({ "payments": payments })))
}
