//! Token quota routes

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tokengate_core::{Availability, ConsumeOutcome, Error, TokenStatus};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

/// Token routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/check", get(check))
        .route("/consume", post(consume))
}

#[derive(Debug, Default, Deserialize)]
pub struct ConsumeRequest {
    #[serde(default)]
    pub operation: Option<String>,
}

async fn status(State(state): State<AppState>, AuthUser(user_id): AuthUser) -> ApiResult<Json<TokenStatus>> {
    Ok(Json(state.entitlements.status(&user_id).await?))
}

async fn check(State(state): State<AppState>, AuthUser(user_id): AuthUser) -> ApiResult<Json<Availability>> {
    Ok(Json(state.entitlements.check(&user_id).await?))
}

/// Spend one token. Exhaustion is answered with 429 and `tokensRemaining: 0`.
async fn consume(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Option<Json<ConsumeRequest>>,
) -> ApiResult<Json<ConsumeOutcome>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let operation = req.operation.unwrap_or_default();

    let outcome = state.entitlements.consume(&user_id, &operation).await?;
    if !outcome.success {
        return Err(Error::quota_exceeded().into());
    }
    Ok(Json(outcome))
}
