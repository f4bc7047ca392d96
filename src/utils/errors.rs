//! Application error taxonomy.
//!
//! Every checked failure the auth core can surface to the controller layer
//! is a variant here, and the [`IntoResponse`] impl is the single place
//! where they are mapped to HTTP statuses. Storage failures propagate as
//! [`AppError::Database`] and are never retried.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("user not found")]
    UserNotFound,

    #[error("a user with this email already exists")]
    UserAlreadyExists,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is not activated")]
    AccountDisabled,

    #[error("account is locked")]
    AccountLocked,

    #[error("invalid token")]
    InvalidToken,

    #[error("token has expired")]
    TokenExpired,

    #[error("token not found")]
    TokenNotFound,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UserNotFound | AppError::TokenNotFound => StatusCode::NOT_FOUND,
            AppError::UserAlreadyExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::AccountDisabled | AppError::AccountLocked => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Storage and internal failures are logged with detail but reported
        // to the client with a generic message.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
