//! Request authenticator: the per-request gate in front of every API call.
//!
//! The middleware never rejects a request. Missing headers, malformed or
//! revoked tokens and unknown principals all collapse to "no authenticated
//! principal"; the request is forwarded either way and the downstream
//! [`AuthUser`] extractor is what produces a 401 on routes that need one.
//! The authenticated principal lives in a request-scoped extension, never
//! in process-wide state.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::config::jwt::JwtConfig;
use crate::modules::auth::ledger::{PgTokenLedger, TokenLedger};
use crate::modules::users::model::UserRole;
use crate::modules::users::store::{CredentialStore, PgCredentialStore};
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::decode_claims;

/// The authenticated principal established for the remainder of request
/// processing, carrying the role-derived authority set.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub authorities: Vec<String>,
}

/// Slice the token out of an `Authorization` header value.
fn bearer_token<'a>(header_value: &'a str, prefix: &str) -> Option<&'a str> {
    header_value.strip_prefix(prefix).filter(|t| !t.is_empty())
}

/// Validate a bearer token against the codec, credential store and ledger.
///
/// Requires: claims that signature-check, an enabled and unlocked principal
/// matching the subject, a valid ledger row for the exact value, and an
/// embedded expiry strictly after now. Every failure mode, including a
/// storage error, degrades to `None`.
pub(crate) async fn resolve_current_user(
    users: &impl CredentialStore,
    tokens: &impl TokenLedger,
    jwt_config: &JwtConfig,
    token: &str,
) -> Option<CurrentUser> {
    let claims = decode_claims(token, jwt_config).ok()?;

    let user = match users.find_active_by_email(&claims.sub).await {
        Ok(user) => user?,
        Err(e) => {
            tracing::error!(error = %e, "credential lookup failed during request auth");
            return None;
        }
    };

    let row = match tokens.find_valid_by_value(token).await {
        Ok(row) => row?,
        Err(e) => {
            tracing::error!(error = %e, "ledger lookup failed during request auth");
            return None;
        }
    };

    if claims.sub != user.email || row.user_id != user.id {
        return None;
    }

    // Strictly after now: a token expiring exactly now is already dead.
    if claims.exp <= chrono::Utc::now().timestamp() {
        return None;
    }

    Some(CurrentUser {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role,
        authorities: claims.authorities,
    })
}

/// The authentication filter. Runs once per request, forwards the request
/// regardless of outcome.
pub async fn authenticate_request(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    // Runs at most once per request.
    if req.extensions().get::<CurrentUser>().is_some() {
        return next.run(req).await;
    }

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| bearer_token(value, &state.jwt_config.bearer_prefix))
        .map(|t| t.to_string());

    let Some(token) = token else {
        return next.run(req).await;
    };

    let users = PgCredentialStore::new(state.db.clone());
    let tokens = PgTokenLedger::new(state.db.clone());

    if let Some(current_user) =
        resolve_current_user(&users, &tokens, &state.jwt_config, &token).await
    {
        req.extensions_mut().insert(current_user);
    }

    next.run(req).await
}

/// Extractor for routes that require an authenticated principal. This is
/// the downstream authorization layer: it turns an empty request context
/// into a 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub CurrentUser);

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.0.authorities.iter().any(|a| a == permission)
    }

    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        permissions.iter().any(|p| self.has_permission(p))
    }

    pub fn has_all_permissions(&self, permissions: &[&str]) -> bool {
        permissions.iter().all(|p| self.has_permission(p))
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))
    }
}
