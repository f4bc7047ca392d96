//! In-memory store implementations for tests.
//!
//! These back the service and middleware unit tests so the auth core's
//! behavior can be exercised without a database. Both stores serialize all
//! access through a single lock, which also makes `rotate` trivially
//! atomic.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::jwt::JwtConfig;
use crate::modules::auth::ledger::{RevocationScope, TokenLedger};
use crate::modules::auth::model::{NewToken, StoredToken, TokenKind};
use crate::modules::users::model::{NewUser, User, UserRole};
use crate::modules::users::store::{CredentialStore, UserCredentials};
use crate::utils::errors::AppError;

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: b"test-secret-key-at-least-32-characters-long".to_vec(),
        access_token_expiry_ms: 3_600_000,
        refresh_token_expiry_ms: 604_800_000,
        activation_code_expiry_ms: 86_400_000,
        issuer: "slateboard-test".to_string(),
        bearer_prefix: "Bearer ".to_string(),
    }
}

// Low bcrypt cost keeps the test suite fast; never used outside tests.
const TEST_BCRYPT_COST: u32 = 4;

#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<Vec<(User, String)>>,
}

impl MemoryCredentialStore {
    /// Insert an enabled, unlocked student account directly, bypassing the
    /// registration flow.
    pub async fn add_enabled_user(&self, email: &str, password: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            first_name: "Test".into(),
            last_name: "User".into(),
            email: email.to_string(),
            role: UserRole::Student,
            enabled: true,
            locked: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let hash = bcrypt::hash(password, TEST_BCRYPT_COST).unwrap();
        self.users.lock().unwrap().push((user.clone(), hash));
        user
    }

    pub async fn lock(&self, user_id: Uuid) {
        let mut users = self.users.lock().unwrap();
        if let Some((user, _)) = users.iter_mut().find(|(u, _)| u.id == user_id) {
            user.locked = true;
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, _)| u.clone()))
    }

    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|(u, _)| u.email == email && u.enabled && !u.locked)
            .map(|(u, _)| u.clone()))
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| UserCredentials {
                user: u.clone(),
                password_hash: hash.clone(),
            }))
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, AppError> {
        let user = User {
            id: Uuid::new_v4(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            role: new_user.role,
            enabled: false,
            locked: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        self.users
            .lock()
            .unwrap()
            .push((user.clone(), new_user.password));
        Ok(user)
    }

    async fn enable(&self, user_id: Uuid) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        if let Some((user, _)) = users.iter_mut().find(|(u, _)| u.id == user_id) {
            user.enabled = true;
            user.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTokenLedger {
    rows: Mutex<Vec<StoredToken>>,
}

impl MemoryTokenLedger {
    pub async fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn insert_row(rows: &mut Vec<StoredToken>, new_token: NewToken) -> StoredToken {
        let row = StoredToken {
            id: Uuid::new_v4(),
            user_id: new_token.user_id,
            token: new_token.token,
            kind: new_token.kind,
            expired: false,
            revoked: false,
            issued_at: Utc::now(),
            expired_at: None,
            revoked_at: None,
        };
        rows.push(row.clone());
        row
    }
}

#[async_trait]
impl TokenLedger for MemoryTokenLedger {
    async fn save(&self, new_token: NewToken) -> Result<StoredToken, AppError> {
        let mut rows = self.rows.lock().unwrap();
        Ok(Self::insert_row(&mut rows, new_token))
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<StoredToken>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|t| t.token == value).cloned())
    }

    async fn find_valid_by_value(&self, value: &str) -> Result<Option<StoredToken>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|t| t.token == value && !t.expired && !t.revoked)
            .cloned())
    }

    async fn find_all_valid(&self, user_id: Uuid) -> Result<Vec<StoredToken>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|t| t.user_id == user_id && !t.expired && !t.revoked)
            .cloned()
            .collect())
    }

    async fn revoke(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|t| t.id == token_id) {
            row.expired = true;
            row.revoked = true;
            row.expired_at = Some(at);
            row.revoked_at = Some(at);
        }
        Ok(())
    }

    async fn rotate(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
        scope: RevocationScope,
        new_tokens: Vec<NewToken>,
    ) -> Result<Vec<StoredToken>, AppError> {
        let mut rows = self.rows.lock().unwrap();

        for row in rows.iter_mut() {
            if row.user_id != user_id || row.expired || row.revoked {
                continue;
            }
            if let RevocationScope::Kind(kind) = scope {
                if row.kind != kind {
                    continue;
                }
            }
            row.expired = true;
            row.revoked = true;
            row.expired_at = Some(at);
            row.revoked_at = Some(at);
        }

        Ok(new_tokens
            .into_iter()
            .map(|t| Self::insert_row(&mut rows, t))
            .collect())
    }

    async fn purge_expired_and_revoked(&self) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| !(t.expired && t.revoked));
        Ok((before - rows.len()) as u64)
    }
}
