//! Authentication service: registration, login, refresh, logout and
//! account activation.
//!
//! The service is the sole writer of the token ledger. Per session the
//! lifecycle is Unauthenticated -> Registered(disabled) -> Activated ->
//! Authenticated -> (Refreshed)* -> LoggedOut. Every successful login or
//! refresh rotates tokens through a single ledger transaction, so no reader
//! ever observes two simultaneously-valid access tokens for one principal.

use chrono::Utc;
use tracing::{instrument, warn};

use crate::config::jwt::JwtConfig;
use crate::modules::users::model::Principal;
use crate::modules::users::store::CredentialStore;
use crate::utils::email::EmailService;
use crate::utils::errors::AppError;
use crate::utils::jwt::{
    decode_claims, issue_access_token, issue_activation_token, issue_refresh_token,
};
use crate::utils::password::{hash_password, verify_password};

use super::ledger::{RevocationScope, TokenLedger};
use super::model::{LoginRequest, NewToken, RegisterRequestDto, TokenKind, TokenPair};
use crate::modules::users::model::NewUser;

pub struct AuthService;

impl AuthService {
    /// Registers a new, disabled account and issues its first token pair.
    ///
    /// Both tokens are persisted in the ledger (chosen over the
    /// refresh-unpersisted variant so logout and login revocation apply
    /// uniformly). An activation code is issued alongside and mailed to the
    /// new account.
    #[instrument(skip_all, fields(email = %dto.email))]
    pub async fn register(
        users: &impl CredentialStore,
        tokens: &impl TokenLedger,
        mailer: &EmailService,
        jwt_config: &JwtConfig,
        dto: RegisterRequestDto,
    ) -> Result<TokenPair, AppError> {
        if users.find_by_email(&dto.email).await?.is_some() {
            return Err(AppError::UserAlreadyExists);
        }

        let hashed_password = hash_password(&dto.password)?;

        let user = users
            .insert(NewUser {
                first_name: dto.first_name,
                last_name: dto.last_name,
                email: dto.email,
                password: hashed_password,
                role: dto.role,
            })
            .await?;

        let access_token = issue_access_token(&user, jwt_config)?;
        let refresh_token = issue_refresh_token(&user, jwt_config)?;

        tokens
            .save(NewToken {
                user_id: user.id,
                token: access_token.clone(),
                kind: TokenKind::Access,
            })
            .await?;
        tokens
            .save(NewToken {
                user_id: user.id,
                token: refresh_token.clone(),
                kind: TokenKind::Refresh,
            })
            .await?;

        Self::issue_and_send_activation_code(&user, tokens, mailer, jwt_config).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verifies credentials and account flags, then rotates the principal's
    /// tokens: everything previously valid is revoked and a fresh pair is
    /// persisted, atomically.
    #[instrument(skip_all, fields(email = %dto.email))]
    pub async fn authenticate(
        users: &impl CredentialStore,
        tokens: &impl TokenLedger,
        jwt_config: &JwtConfig,
        dto: LoginRequest,
    ) -> Result<TokenPair, AppError> {
        let credentials = users
            .find_credentials(&dto.email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !verify_password(&dto.password, &credentials.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let user = credentials.user;
        if !user.enabled {
            return Err(AppError::AccountDisabled);
        }
        if user.locked {
            return Err(AppError::AccountLocked);
        }

        let access_token = issue_access_token(&user, jwt_config)?;
        let refresh_token = issue_refresh_token(&user, jwt_config)?;

        tokens
            .rotate(
                user.id,
                Utc::now(),
                RevocationScope::AllValid,
                vec![
                    NewToken {
                        user_id: user.id,
                        token: access_token.clone(),
                        kind: TokenKind::Access,
                    },
                    NewToken {
                        user_id: user.id,
                        token: refresh_token.clone(),
                        kind: TokenKind::Refresh,
                    },
                ],
            )
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Mints a new access token from a refresh token.
    ///
    /// The refresh token itself is re-returned unrotated; it stays usable
    /// for its full TTL and is only invalidated by a later login or logout.
    /// Prior valid access tokens are revoked in the same transaction that
    /// persists the replacement.
    #[instrument(skip_all)]
    pub async fn refresh_token(
        users: &impl CredentialStore,
        tokens: &impl TokenLedger,
        jwt_config: &JwtConfig,
        bearer_refresh_token: &str,
    ) -> Result<TokenPair, AppError> {
        let claims = decode_claims(bearer_refresh_token, jwt_config)?;

        let user = users
            .find_by_email(&claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if claims.sub != user.identifier() {
            return Err(AppError::InvalidToken);
        }

        // Strict comparison: a token expiring exactly now is already dead.
        if claims.exp <= Utc::now().timestamp() {
            return Err(AppError::TokenExpired);
        }

        let access_token = issue_access_token(&user, jwt_config)?;

        tokens
            .rotate(
                user.id,
                Utc::now(),
                RevocationScope::Kind(TokenKind::Access),
                vec![NewToken {
                    user_id: user.id,
                    token: access_token.clone(),
                    kind: TokenKind::Access,
                }],
            )
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token: bearer_refresh_token.to_string(),
        })
    }

    /// Revokes the token behind a bearer value. Idempotent: an unknown
    /// value is a silent no-op, and a row whose flags are already set is
    /// never touched again.
    #[instrument(skip_all)]
    pub async fn logout(tokens: &impl TokenLedger, token_value: &str) -> Result<(), AppError> {
        if let Some(row) = tokens.find_by_value(token_value).await? {
            if row.is_valid() {
                tokens.revoke(row.id, Utc::now()).await?;
            }
        }

        Ok(())
    }

    /// Issues a fresh activation code for the account and mails it.
    /// Permitted even when the account is already enabled.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn generate_activation_code(
        users: &impl CredentialStore,
        tokens: &impl TokenLedger,
        mailer: &EmailService,
        jwt_config: &JwtConfig,
        email: &str,
    ) -> Result<(), AppError> {
        let user = users
            .find_by_email(email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        Self::issue_and_send_activation_code(&user, tokens, mailer, jwt_config).await
    }

    /// Confirms an account from an activation code: validates kind, ledger
    /// state and embedded expiry, enables the principal and spends the code.
    #[instrument(skip_all)]
    pub async fn confirm_account(
        users: &impl CredentialStore,
        tokens: &impl TokenLedger,
        jwt_config: &JwtConfig,
        code: &str,
    ) -> Result<(), AppError> {
        let row = tokens
            .find_by_value(code)
            .await?
            .ok_or(AppError::TokenNotFound)?;

        if row.kind != TokenKind::ActivationCode || !row.is_valid() {
            return Err(AppError::InvalidToken);
        }

        let claims = decode_claims(code, jwt_config)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(AppError::TokenExpired);
        }

        let user = users
            .find_by_email(&claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)?;

        users.enable(user.id).await?;
        tokens.revoke(row.id, Utc::now()).await?;

        Ok(())
    }

    async fn issue_and_send_activation_code(
        user: &crate::modules::users::model::User,
        tokens: &impl TokenLedger,
        mailer: &EmailService,
        jwt_config: &JwtConfig,
    ) -> Result<(), AppError> {
        let code = issue_activation_token(user, jwt_config)?;

        tokens
            .save(NewToken {
                user_id: user.id,
                token: code.clone(),
                kind: TokenKind::ActivationCode,
            })
            .await?;

        // Mail delivery is a collaborator concern; a failed send must not
        // roll back the account or the issued code.
        if let Err(e) = mailer
            .send_activation_email(&user.email, &user.first_name, &code)
            .await
        {
            warn!(error = %e, email = %user.email, "failed to send activation email");
        }

        Ok(())
    }
}
