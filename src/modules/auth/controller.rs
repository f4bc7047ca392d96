use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use crate::middleware::auth::AuthUser;
use crate::modules::auth::ledger::PgTokenLedger;
use crate::modules::users::model::UserRole;
use crate::modules::users::store::PgCredentialStore;
use crate::state::AppState;
use crate::utils::email::EmailService;
use crate::utils::errors::AppError;
use crate::validator::ValidatedJson;

use super::model::{
    ActivationCodeRequest, ConfirmAccountParams, LoginRequest, MessageResponse,
    RegisterRequestDto, TokenPair,
};
use super::service::AuthService;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: uuid::Uuid,
    pub email: String,
    pub role: UserRole,
    pub authorities: Vec<String>,
}

fn bearer_value(headers: &HeaderMap, prefix: &str) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(prefix))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
}

/// Register a new account and receive an initial token pair
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequestDto,
    responses(
        (status = 201, description = "Account registered, activation email sent", body = TokenPair),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<RegisterRequestDto>,
) -> Result<(StatusCode, Json<TokenPair>), AppError> {
    let users = PgCredentialStore::new(state.db.clone());
    let tokens = PgTokenLedger::new(state.db.clone());
    let mailer = EmailService::new(state.email_config.clone());

    let pair = AuthService::register(&users, &tokens, &mailer, &state.jwt_config, dto).await?;
    Ok((StatusCode::CREATED, Json(pair)))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account disabled or locked", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let users = PgCredentialStore::new(state.db.clone());
    let tokens = PgTokenLedger::new(state.db.clone());

    let pair = AuthService::authenticate(&users, &tokens, &state.jwt_config, dto).await?;
    Ok(Json(pair))
}

/// Exchange a refresh token for a new access token
///
/// The refresh token travels in the `Authorization` header. An absent or
/// non-bearer header is a no-op that returns an empty 200.
#[utoipa::path(
    post,
    path = "/api/auth/refresh-token",
    responses(
        (status = 200, description = "New token pair, or empty body when no bearer header present", body = TokenPair),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<axum::response::Response, AppError> {
    let Some(token) = bearer_value(&headers, &state.jwt_config.bearer_prefix) else {
        return Ok(StatusCode::OK.into_response());
    };

    let users = PgCredentialStore::new(state.db.clone());
    let tokens = PgTokenLedger::new(state.db.clone());

    let pair = AuthService::refresh_token(&users, &tokens, &state.jwt_config, &token).await?;
    Ok(Json(pair).into_response())
}

/// Confirm an account with an activation code
#[utoipa::path(
    put,
    path = "/api/auth/confirm-account",
    params(("code" = String, Query, description = "Activation code from the email")),
    responses(
        (status = 200, description = "Account activated", body = MessageResponse),
        (status = 401, description = "Invalid or expired activation code", body = ErrorResponse),
        (status = 404, description = "Code or user not found", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn confirm_account(
    State(state): State<AppState>,
    Query(params): Query<ConfirmAccountParams>,
) -> Result<Json<MessageResponse>, AppError> {
    let users = PgCredentialStore::new(state.db.clone());
    let tokens = PgTokenLedger::new(state.db.clone());

    AuthService::confirm_account(&users, &tokens, &state.jwt_config, &params.code).await?;
    Ok(Json(MessageResponse {
        message: "Account activated. You can now log in.".to_string(),
    }))
}

/// Request a fresh activation code
#[utoipa::path(
    post,
    path = "/api/auth/activation-code",
    request_body = ActivationCodeRequest,
    responses(
        (status = 200, description = "Activation code issued and mailed", body = MessageResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn generate_activation_code(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ActivationCodeRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let users = PgCredentialStore::new(state.db.clone());
    let tokens = PgTokenLedger::new(state.db.clone());
    let mailer = EmailService::new(state.email_config.clone());

    AuthService::generate_activation_code(&users, &tokens, &mailer, &state.jwt_config, &dto.email)
        .await?;
    Ok(Json(MessageResponse {
        message: "A new activation code has been sent.".to_string(),
    }))
}

/// Logout by revoking the presented bearer token
///
/// Idempotent: unknown or already-revoked tokens are a silent no-op.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Token revoked (or nothing to revoke)", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AppError> {
    if let Some(token) = bearer_value(&headers, &state.jwt_config.bearer_prefix) {
        let tokens = PgTokenLedger::new(state.db.clone());
        AuthService::logout(&tokens, &token).await?;
    }

    Ok(Json(MessageResponse {
        message: "Logged out.".to_string(),
    }))
}

/// The authenticated principal behind the presented bearer token
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current principal", body = ProfileResponse),
        (status = 401, description = "No authenticated principal", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn me(auth_user: AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user_id: auth_user.0.user_id,
        email: auth_user.0.email,
        role: auth_user.0.role,
        authorities: auth_user.0.authorities,
    })
}
