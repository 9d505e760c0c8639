use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// ApiError
///
/// The full error taxonomy of the service. Every fallible operation — the
/// authorization gate, the credential store, the post store, and the comment/like
/// mutator — funnels into this enum, which carries the HTTP status mapping and the
/// response rendering in one place.
///
/// Internal failures (database, hashing, token signing) deliberately render a
/// generic message: the underlying error is logged server-side but never surfaced
/// to the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request carried no usable bearer credential.
    #[error("missing or malformed credentials")]
    Unauthenticated,

    /// The credential failed verification: bad signature, expired token, or a
    /// failed login. Deliberately a single variant so that login responses never
    /// reveal whether the email or the password was wrong.
    #[error("invalid credentials")]
    InvalidCredential,

    /// Authenticated, but lacking ownership or the admin flag for this operation.
    #[error("forbidden")]
    Forbidden,

    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Registration or profile update collided with an existing email.
    #[error("email already registered")]
    DuplicateEmail,

    /// The request body was syntactically valid JSON but semantically unusable.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("password hashing error: {0}")]
    Hash(String),

    #[error("token signing error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl ApiError {
    /// Maps each taxonomy variant onto its HTTP status code.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredential => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Hash(_) | ApiError::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message rendered to the caller. Server-side failures collapse to a
    /// generic string so that internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::Database(_) | ApiError::Hash(_) | ApiError::Token(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "replying with error");

        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Convenience alias used throughout handlers and the repository.
pub type ApiResult<T> = Result<T, ApiError>;
