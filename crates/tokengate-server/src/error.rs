//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tokengate_core::Error;

/// Core error rendered as a JSON response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Authentication(_) | Error::Jwt(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Validation(_) | Error::UnknownPlan(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::PaymentNotConfirmed(_) => StatusCode::PAYMENT_REQUIRED,
            Error::DuplicateTransition { .. } => StatusCode::CONFLICT,
            Error::Gateway(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Store(_) if self.0.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self.0 {
            Error::QuotaExceeded { tokens_remaining } => json!({
                "success": false,
                "error": "Daily token limit reached",
                "tokensRemaining": tokens_remaining,
                "upgradeRequired": true,
            }),
            err if status.is_server_error() => {
                log::error!("[api] {} {}", status, err);
                json!({ "success": false, "error": "Internal server error" })
            }
            err => json!({ "success": false, "error": err.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
