//! Token ledger: the durable record of every issued token.
//!
//! The authentication service is the sole writer. Rows are only ever
//! mutated to flip the `expired`/`revoked` flags; deletion happens
//! exclusively through [`TokenLedger::purge_expired_and_revoked`], which is
//! driven by the periodic sweep task and never by the request path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::utils::errors::AppError;

use super::model::{NewToken, StoredToken, TokenKind};

const TOKEN_COLUMNS: &str =
    "id, user_id, token, kind, expired, revoked, issued_at, expired_at, revoked_at";

/// Which of a principal's valid tokens a [`TokenLedger::rotate`] call kills.
///
/// Login invalidates everything the principal holds; refresh only replaces
/// access tokens and leaves the refresh token untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationScope {
    AllValid,
    Kind(TokenKind),
}

#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Record a freshly issued token. Identity is assigned on insert.
    async fn save(&self, new_token: NewToken) -> Result<StoredToken, AppError>;

    /// Look up a row by its exact token string, regardless of validity.
    async fn find_by_value(&self, value: &str) -> Result<Option<StoredToken>, AppError>;

    /// Like [`find_by_value`](TokenLedger::find_by_value), filtered to
    /// `expired = false AND revoked = false`.
    async fn find_valid_by_value(&self, value: &str) -> Result<Option<StoredToken>, AppError>;

    /// All non-expired, non-revoked tokens for a principal.
    async fn find_all_valid(&self, user_id: Uuid) -> Result<Vec<StoredToken>, AppError>;

    /// Flip both flags on a single row, stamping the given time.
    async fn revoke(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Revoke the principal's currently-valid tokens in `scope`, then insert
    /// the replacements, inside one transaction. A reader can never observe
    /// the new tokens alongside still-valid old ones; if the insert fails
    /// the revocation rolls back with it.
    async fn rotate(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
        scope: RevocationScope,
        new_tokens: Vec<NewToken>,
    ) -> Result<Vec<StoredToken>, AppError>;

    /// Bulk-delete rows whose flags are both set. Returns the number of rows
    /// removed. Only the sweep task calls this.
    async fn purge_expired_and_revoked(&self) -> Result<u64, AppError>;
}

#[derive(Clone)]
pub struct PgTokenLedger {
    pool: PgPool,
}

impl PgTokenLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenLedger for PgTokenLedger {
    async fn save(&self, new_token: NewToken) -> Result<StoredToken, AppError> {
        let row = sqlx::query_as::<_, StoredToken>(&format!(
            "INSERT INTO tokens (user_id, token, kind, expired, revoked, issued_at)
             VALUES ($1, $2, $3, FALSE, FALSE, NOW())
             RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(new_token.user_id)
        .bind(&new_token.token)
        .bind(new_token.kind)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<StoredToken>, AppError> {
        let row = sqlx::query_as::<_, StoredToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE token = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_valid_by_value(&self, value: &str) -> Result<Option<StoredToken>, AppError> {
        let row = sqlx::query_as::<_, StoredToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens
             WHERE token = $1 AND expired = FALSE AND revoked = FALSE"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all_valid(&self, user_id: Uuid) -> Result<Vec<StoredToken>, AppError> {
        let rows = sqlx::query_as::<_, StoredToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens
             WHERE user_id = $1 AND expired = FALSE AND revoked = FALSE
             ORDER BY issued_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn revoke(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE tokens
             SET expired = TRUE, revoked = TRUE, expired_at = $2, revoked_at = $2
             WHERE id = $1",
        )
        .bind(token_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn rotate(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
        scope: RevocationScope,
        new_tokens: Vec<NewToken>,
    ) -> Result<Vec<StoredToken>, AppError> {
        let mut tx = self.pool.begin().await?;

        match scope {
            RevocationScope::AllValid => {
                sqlx::query(
                    "UPDATE tokens
                     SET expired = TRUE, revoked = TRUE, expired_at = $2, revoked_at = $2
                     WHERE user_id = $1 AND expired = FALSE AND revoked = FALSE",
                )
                .bind(user_id)
                .bind(at)
                .execute(&mut *tx)
                .await?;
            }
            RevocationScope::Kind(kind) => {
                sqlx::query(
                    "UPDATE tokens
                     SET expired = TRUE, revoked = TRUE, expired_at = $2, revoked_at = $2
                     WHERE user_id = $1 AND kind = $3 AND expired = FALSE AND revoked = FALSE",
                )
                .bind(user_id)
                .bind(at)
                .bind(kind)
                .execute(&mut *tx)
                .await?;
            }
        }

        let mut inserted = Vec::with_capacity(new_tokens.len());
        for new_token in new_tokens {
            let row = sqlx::query_as::<_, StoredToken>(&format!(
                "INSERT INTO tokens (user_id, token, kind, expired, revoked, issued_at)
                 VALUES ($1, $2, $3, FALSE, FALSE, NOW())
                 RETURNING {TOKEN_COLUMNS}"
            ))
            .bind(new_token.user_id)
            .bind(&new_token.token)
            .bind(new_token.kind)
            .fetch_one(&mut *tx)
            .await?;

            inserted.push(row);
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn purge_expired_and_revoked(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM tokens WHERE expired = TRUE AND revoked = TRUE")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Spawns the periodic sweep that deletes logically-dead rows. Fully
/// decoupled from request handling; a row it deletes is by definition never
/// a candidate for `find_valid_by_value`.
pub fn spawn_purge_sweep(ledger: PgTokenLedger, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        loop {
            tick.tick().await;
            match ledger.purge_expired_and_revoked().await {
                Ok(purged) if purged > 0 => {
                    tracing::info!(purged, "token sweep removed dead rows");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "token sweep failed"),
            }
        }
    });
}
