//! Token codec: issue and verify signed, time-bounded tokens.
//!
//! Tokens are compact JWTs signed with HMAC-SHA256 over the serialized
//! claims. The codec is a pure function of its input plus the configured
//! secret and TTLs: it verifies signatures and shape, but expiry and
//! revocation are business rules checked by callers through
//! [`expiration_of`] and the ledger.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::config::jwt::JwtConfig;
use crate::modules::auth::model::Claims;
use crate::modules::users::model::Principal;
use crate::utils::errors::AppError;

fn sign(claims: &Claims, jwt_config: &JwtConfig) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(&jwt_config.secret),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

fn build_claims(
    principal: &impl Principal,
    ttl_ms: i64,
    authorities: Vec<String>,
    jwt_config: &JwtConfig,
) -> Claims {
    let now = Utc::now();
    let expires_at = now + Duration::milliseconds(ttl_ms);

    Claims {
        sub: principal.identifier().to_string(),
        iss: jwt_config.issuer.clone(),
        aud: principal.role_name().to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
        authorities,
    }
}

/// Issues an access token carrying the principal's role-derived authorities
/// as a custom claim.
pub fn issue_access_token(
    principal: &impl Principal,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let claims = build_claims(
        principal,
        jwt_config.access_token_expiry_ms,
        principal.role_authorities(),
        jwt_config,
    );
    sign(&claims, jwt_config)
}

/// Issues a refresh token: longer TTL, no claims beyond the standard set.
pub fn issue_refresh_token(
    principal: &impl Principal,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let claims = build_claims(
        principal,
        jwt_config.refresh_token_expiry_ms,
        Vec::new(),
        jwt_config,
    );
    sign(&claims, jwt_config)
}

/// Issues an account-activation code with its own TTL.
pub fn issue_activation_token(
    principal: &impl Principal,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let claims = build_claims(
        principal,
        jwt_config.activation_code_expiry_ms,
        Vec::new(),
        jwt_config,
    );
    sign(&claims, jwt_config)
}

/// Parses and signature-checks a token, returning its claims.
///
/// Expiry is deliberately NOT enforced here. Callers that care about the
/// time bound compare [`Claims::exp`] (or [`expiration_of`]) against now
/// with a strict `>` so that a token expiring exactly now is already dead.
pub fn decode_claims(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(&jwt_config.secret),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidToken)
}

/// The subject (principal identifier) embedded in a token.
pub fn subject_of(token: &str, jwt_config: &JwtConfig) -> Result<String, AppError> {
    decode_claims(token, jwt_config).map(|claims| claims.sub)
}

/// The expiry timestamp embedded in a token.
pub fn expiration_of(token: &str, jwt_config: &JwtConfig) -> Result<DateTime<Utc>, AppError> {
    let claims = decode_claims(token, jwt_config)?;
    DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(AppError::InvalidToken)
}
