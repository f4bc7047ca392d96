//! Auth data models: signed claims, ledger rows, and request/response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::modules::users::model::UserRole;

/// Claims payload embedded in every signed token.
///
/// Not persisted; reconstructed from the token string on every decode. Any
/// mutation of the serialized form invalidates the HMAC signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal identifier (email).
    pub sub: String,
    /// Issuing service name.
    pub iss: String,
    /// Role name of the principal at issuance.
    pub aud: String,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds). Enforced by callers with a strict
    /// `exp > now` comparison, not by the codec.
    pub exp: i64,
    /// Role-derived permission strings, present on access tokens only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorities: Vec<String>,
}

/// Discriminates ledger rows by what the token is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "token_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    ActivationCode,
}

/// A persisted ledger row for one issued token.
///
/// `token` is unique and immutable once issued. The row is only ever
/// mutated to flip `expired`/`revoked`; once both are true it is never
/// updated again and becomes a candidate for the periodic purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct StoredToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub kind: TokenKind,
    pub expired: bool,
    pub revoked: bool,
    pub issued_at: DateTime<Utc>,
    pub expired_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// True while neither flag has been flipped.
    pub fn is_valid(&self) -> bool {
        !self.expired && !self.revoked
    }
}

/// Fields required to record a freshly issued token.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub user_id: Uuid,
    pub token: String,
    pub kind: TokenKind,
}

// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequestDto {
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: UserRole,
}

// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Token pair returned by register, login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ActivationCodeRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmAccountParams {
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
