//! Authenticated identities.
//!
//! # Data Flow
//! ```text
//! Authorization: Basic ... (transport)
//!     → Credentials
//!     → AuthenticatedUser::create_from_credentials(db, credentials)
//!         → UserAccount loaded from the "users" table
//!         → argon2 password verification
//!     → AuthenticatedUser attached to the Request
//! ```
//!
//! # Design Decisions
//! - Every request carries a user; the default is the anonymous role
//! - Roles are an open set of integer codes ordered by privilege
//! - Unknown user and wrong password are one error to callers

pub mod account;
pub mod credentials;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Db, DbError, Persistible};

pub use account::UserAccount;
pub use credentials::Credentials;

/// Errors raised while authenticating.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credentials do not match a stored account.
    #[error("invalid credentials for {0:?}")]
    InvalidCredentials(String),

    /// The password could not be hashed.
    #[error("password hashing failed")]
    Hashing,

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Privilege level. Higher codes carry more privilege; codes outside the
/// named constants are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub i32);

impl Role {
    pub const ANONYMOUS: Role = Role(0);
    pub const MEMBER: Role = Role(10);
    pub const EDITOR: Role = Role(50);
    pub const ADMIN: Role = Role(100);
}

impl Default for Role {
    fn default() -> Self {
        Role::ANONYMOUS
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Role::ANONYMOUS => f.write_str("anonymous"),
            Role::MEMBER => f.write_str("member"),
            Role::EDITOR => f.write_str("editor"),
            Role::ADMIN => f.write_str("admin"),
            Role(code) => write!(f, "role({})", code),
        }
    }
}

/// The identity a request runs as.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    username: Option<String>,
    role: Role,
    fields: BTreeMap<String, String>,
}

impl AuthenticatedUser {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A user with the given name and role and no extra fields.
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: Some(username.into()),
            role,
            fields: BTreeMap::new(),
        }
    }

    /// Validate `credentials` against the accounts stored in `db`.
    pub fn create_from_credentials(db: &dyn Db, credentials: &Credentials) -> Result<Self, AuthError> {
        let account = UserAccount::create_from_data(db, credentials.username())?;
        match account {
            Some(account) if account.verify(credentials.password()) => Ok(account.into()),
            Some(_) => Err(AuthError::InvalidCredentials(credentials.username().to_string())),
            None => {
                // Keep unknown users on the same cost as a failed verification.
                account::burn_verification(credentials.password());
                Err(AuthError::InvalidCredentials(credentials.username().to_string()))
            }
        }
    }

    /// Create and store an account, returning the user it authenticates as.
    pub fn register(
        db: &dyn Db,
        username: &str,
        password: &str,
        role: Role,
        fields: BTreeMap<String, String>,
    ) -> Result<Self, AuthError> {
        let account = UserAccount::new(username, password, role, fields)?;
        account.persist(db)?;
        tracing::info!(username = %username, role = %role, "Account registered");
        Ok(account.into())
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_none()
    }

    /// True when this user's role is at least `role`.
    pub fn has_role(&self, role: Role) -> bool {
        self.role >= role
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

impl From<UserAccount> for AuthenticatedUser {
    fn from(account: UserAccount) -> Self {
        Self {
            username: Some(account.username),
            role: account.role,
            fields: account.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;

    fn db_with_pete() -> MemoryDb {
        let db = MemoryDb::new();
        let mut fields = BTreeMap::new();
        fields.insert("alias".to_string(), "mr.pete".to_string());
        AuthenticatedUser::register(&db, "pete", "hunter2", Role::EDITOR, fields).unwrap();
        db
    }

    #[test]
    fn test_anonymous_default() {
        let user = AuthenticatedUser::default();
        assert!(user.is_anonymous());
        assert_eq!(user.role(), Role::ANONYMOUS);
    }

    #[test]
    fn test_valid_credentials() {
        let db = db_with_pete();
        let user = AuthenticatedUser::create_from_credentials(&db, &Credentials::new("pete", "hunter2")).unwrap();
        assert_eq!(user.username(), Some("pete"));
        assert_eq!(user.role(), Role::EDITOR);
        assert_eq!(user.field("alias"), Some("mr.pete"));
        assert!(user.has_role(Role::MEMBER));
        assert!(!user.has_role(Role::ADMIN));
    }

    #[test]
    fn test_invalid_credentials() {
        let db = db_with_pete();
        let wrong = AuthenticatedUser::create_from_credentials(&db, &Credentials::new("pete", "nope"));
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials(_))));

        let unknown = AuthenticatedUser::create_from_credentials(&db, &Credentials::new("paul", "x"));
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials(_))));
    }

    #[test]
    fn test_open_role_codes() {
        assert_eq!(Role(75).to_string(), "role(75)");
        assert!(Role(75) > Role::EDITOR);
    }
}
