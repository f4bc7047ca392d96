//! User data models and the principal capability surface.
//!
//! The auth core never depends on the concrete user row directly; it goes
//! through the [`Principal`] trait so the credential store can change its
//! representation without touching the token code.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Permission strings granted by roles. Centralized so role mappings and
/// route guards never drift apart on spelling.
pub mod permissions {
    pub const USERS_CREATE: &str = "users:create";
    pub const USERS_READ: &str = "users:read";
    pub const USERS_UPDATE: &str = "users:update";
    pub const USERS_DELETE: &str = "users:delete";

    pub const STUDENTS_CREATE: &str = "students:create";
    pub const STUDENTS_READ: &str = "students:read";
    pub const STUDENTS_UPDATE: &str = "students:update";
    pub const STUDENTS_DELETE: &str = "students:delete";

    pub const GRADES_CREATE: &str = "grades:create";
    pub const GRADES_READ: &str = "grades:read";

    pub const REPORTS_VIEW: &str = "reports:view";
    pub const SETTINGS_UPDATE: &str = "settings:update";
}

/// The closed set of roles. The role-to-permission mapping is fixed at
/// compile time; role catalog maintenance is out of scope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Teacher,
    Student,
    Parent,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
            UserRole::Parent => "parent",
        }
    }

    /// Fixed role-derived permission set.
    pub fn permissions(&self) -> &'static [&'static str] {
        use permissions::*;
        match self {
            UserRole::Admin => &[
                USERS_CREATE,
                USERS_READ,
                USERS_UPDATE,
                USERS_DELETE,
                STUDENTS_CREATE,
                STUDENTS_READ,
                STUDENTS_UPDATE,
                STUDENTS_DELETE,
                GRADES_CREATE,
                GRADES_READ,
                REPORTS_VIEW,
                SETTINGS_UPDATE,
            ],
            UserRole::Teacher => &[
                STUDENTS_READ,
                STUDENTS_UPDATE,
                GRADES_CREATE,
                GRADES_READ,
                REPORTS_VIEW,
            ],
            UserRole::Student => &[GRADES_READ],
            UserRole::Parent => &[GRADES_READ, REPORTS_VIEW],
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user account row.
///
/// `enabled` starts false at registration and is flipped by account
/// confirmation; `locked` is an administrative flag. The password column is
/// a bcrypt hash and is deliberately kept out of this struct except where a
/// query explicitly needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
    pub enabled: bool,
    pub locked: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Capability surface the token code sees of a user account.
pub trait Principal {
    /// Stable unique identifier (the email address).
    fn identifier(&self) -> &str;
    /// Role name, stamped into the token's `aud` claim.
    fn role_name(&self) -> &str;
    /// Role-derived permission strings.
    fn role_authorities(&self) -> Vec<String>;
    fn is_enabled(&self) -> bool;
    fn is_locked(&self) -> bool;
}

impl Principal for User {
    fn identifier(&self) -> &str {
        &self.email
    }

    fn role_name(&self) -> &str {
        self.role.as_str()
    }

    fn role_authorities(&self) -> Vec<String> {
        self.role
            .permissions()
            .iter()
            .map(|p| p.to_string())
            .collect()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Fields required to insert a new user account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// bcrypt hash, never the plaintext password.
    pub password: String,
    pub role: UserRole,
}
