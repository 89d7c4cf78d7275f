//! Unified error handling for tokengate-core

use thiserror::Error;

/// Underlying store driver error
pub use sqlx::Error as StoreError;

/// Core error type for tokengate-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Daily allowance is used up. Callers render an upgrade prompt from this.
    #[error("Daily token limit reached ({tokens_remaining} remaining)")]
    QuotaExceeded { tokens_remaining: i64 },

    /// The payment was already applied to an entitlement.
    #[error("Payment {payment_id} was already applied")]
    DuplicateTransition { payment_id: String },

    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("Payment not confirmed: {0}")]
    PaymentNotConfirmed(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for tokengate-core
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Error::Authentication(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a payment gateway error
    pub fn gateway(msg: impl Into<String>) -> Self {
        Error::Gateway(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Quota exhausted for today
    pub fn quota_exceeded() -> Self {
        Error::QuotaExceeded { tokens_remaining: 0 }
    }

    /// Whether the failure came from the store and may succeed on retry.
    ///
    /// Constraint and decode errors are not transient; retrying them only
    /// repeats the same answer.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Store(err) => !matches!(
                err,
                sqlx::Error::RowNotFound
                    | sqlx::Error::ColumnDecode { .. }
                    | sqlx::Error::ColumnNotFound(_)
                    | sqlx::Error::TypeNotFound { .. }
                    | sqlx::Error::Decode(_)
            ) && err
                .as_database_error()
                .map(|db| db.constraint().is_none())
                .unwrap_or(true),
            _ => false,
        }
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
