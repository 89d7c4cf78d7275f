//! Authentication module - JWT tokens and the AuthResolver seam
//!
//! Every metered endpoint resolves its caller through one [`AuthResolver`];
//! credential parsing lives in [`Credentials`] and nowhere else.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::error::{Error, Result};
use crate::models::{Claims, User};

pub const TOKEN_EXPIRY_DAYS: i64 = 7;

/// Cookie carrying the JWT when no Authorization header is sent
pub const AUTH_COOKIE: &str = "auth_token";

// ============================================================================
// Credentials
// ============================================================================

/// Raw credential material pulled off a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Missing,
}

impl Credentials {
    /// Extract a bearer token from an `Authorization` header value or,
    /// failing that, from the `auth_token` cookie.
    pub fn from_headers(authorization: Option<&str>, cookie: Option<&str>) -> Self {
        if let Some(token) = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            return Credentials::Bearer(token.to_string());
        }

        cookie
            .and_then(|header| cookie_value(header, AUTH_COOKIE))
            .map(Credentials::Bearer)
            .unwrap_or(Credentials::Missing)
    }
}

fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

// ============================================================================
// AuthResolver
// ============================================================================

/// Turns request credentials into a user id
pub trait AuthResolver: Send + Sync {
    fn resolve(&self, credentials: &Credentials) -> Result<String>;
}

/// HMAC-signed JWT implementation of [`AuthResolver`]
#[derive(Clone)]
pub struct JwtAuthResolver {
    secret: Vec<u8>,
}

impl JwtAuthResolver {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Create a JWT token for a user
    pub fn create_token(&self, user: &User) -> Result<String> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::days(TOKEN_EXPIRY_DAYS))
            .ok_or_else(|| Error::internal("token expiry overflow"))?
            .timestamp();

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            exp: expiration,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )?)
    }

    /// Verify and decode a JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

impl AuthResolver for JwtAuthResolver {
    fn resolve(&self, credentials: &Credentials) -> Result<String> {
        let token = match credentials {
            Credentials::Bearer(token) => token,
            Credentials::Missing => return Err(Error::auth("Authentication required")),
        };

        let claims = self.verify_token(token).map_err(|e| {
            log::debug!("[auth] rejected token: {}", e);
            Error::auth("Invalid or expired token")
        })?;

        if claims.sub.is_empty() {
            return Err(Error::auth("Invalid token subject"));
        }
        Ok(claims.sub)
    }
}

/// Hash a password
pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    Ok(bcrypt::verify(password, hash)?)
}
