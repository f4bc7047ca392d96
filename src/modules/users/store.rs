//! Credential store: the user-lookup capability consumed by the auth core.
//!
//! The core only ever talks to [`CredentialStore`]; [`PgCredentialStore`] is
//! the Postgres-backed implementation. Tests use the in-memory store from
//! `crate::testing`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::utils::errors::AppError;

use super::model::{NewUser, User};

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, role, enabled, locked, created_at, updated_at";

/// A user row together with its bcrypt password hash, fetched only for
/// credential verification.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user regardless of enabled/locked status.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Look up a user that is enabled and not locked.
    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Look up a user together with the stored password hash.
    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, AppError>;

    /// Insert a new account. Registration creates accounts disabled.
    async fn insert(&self, new_user: NewUser) -> Result<User, AppError>;

    /// Flip the enabled flag on. Idempotent.
    async fn enable(&self, user_id: Uuid) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND enabled = TRUE AND locked = FALSE"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, AppError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            user: User,
            password: String,
        }

        let row = sqlx::query_as::<_, Row>(&format!(
            "SELECT {USER_COLUMNS}, password FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| UserCredentials {
            user: r.user,
            password_hash: r.password,
        }))
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (first_name, last_name, email, password, role, enabled, locked)
             VALUES ($1, $2, $3, $4, $5, FALSE, FALSE)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.email)
        .bind(&new_user.password)
        .bind(new_user.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn enable(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET enabled = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
