//! Stored accounts.

use std::collections::BTreeMap;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{AuthError, Role};
use crate::db::{DbError, Persistible};

/// An account row in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    #[serde(skip)]
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl UserAccount {
    /// Build an account, hashing `password` with Argon2.
    pub fn new(
        username: &str,
        password: &str,
        role: Role,
        fields: BTreeMap<String, String>,
    ) -> Result<Self, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| AuthError::Hashing)?
            .to_string();

        Ok(Self {
            username: username.to_string(),
            password_hash,
            role,
            fields,
        })
    }

    pub fn verify(&self, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.password_hash) else {
            tracing::warn!(username = %self.username, "Stored password hash is malformed");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

impl Persistible for UserAccount {
    const TABLE: &'static str = "users";

    fn key(&self) -> String {
        self.username.clone()
    }

    fn to_data(&self) -> Result<Value, DbError> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_data(key: &str, data: Value) -> Result<Self, DbError> {
        let mut account: UserAccount = serde_json::from_value(data)?;
        account.username = key.to_string();
        Ok(account)
    }
}

/// Spend roughly one verification worth of work on a password that cannot
/// match, so lookups of unknown users cost the same as wrong passwords.
pub(crate) fn burn_verification(password: &str) {
    const DUMMY_HASH: &str =
        "$argon2id$v=19$m=19456,t=2,p=1$dGltaW5nLW9yYWNsZS1kdW1teQ$K4VZh8k8YL3E8H7E8H7E8H7E8H7E8H7E8H7E8H7E8Hs";

    if let Ok(parsed) = PasswordHash::new(DUMMY_HASH) {
        let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
    }
}
