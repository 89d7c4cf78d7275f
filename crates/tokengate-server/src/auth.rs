//! Request authentication extractor

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tokengate_core::auth::Credentials;

use crate::error::ApiError;
use crate::AppState;

/// Id of the authenticated caller.
///
/// Resolution happens before any handler touches the store.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let cookie = parts.headers.get(header::COOKIE).and_then(|v| v.to_str().ok());

        let credentials = Credentials::from_headers(authorization, cookie);
        let user_id = state.auth.resolve(&credentials)?;
        Ok(AuthUser(user_id))
    }
}
