//! User lookup collaborator for the gateway.
//!
//! Persistent storage is outside this service; the gateway only needs a
//! credential check at login and a create at registration, expressed as the
//! [`UserDirectory`] trait. [`InMemoryDirectory`] backs tests and the demo
//! wire-up.

use crate::error::AppError;
use async_trait::async_trait;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up the user and check the password. `Ok(None)` covers both an
    /// unknown email and a wrong password; callers must not distinguish.
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, AppError>;

    async fn create(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<UserRecord, AppError>;
}

struct StoredUser {
    record: UserRecord,
    salt: [u8; 16],
    password_hash: [u8; 32],
}

#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, StoredUser>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn hash_password(salt: &[u8; 16], password: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hasher.finalize().into()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, AppError> {
        let users = self.users.read().await;
        let Some(stored) = users.get(email) else {
            return Ok(None);
        };

        if Self::hash_password(&stored.salt, password) == stored.password_hash {
            Ok(Some(stored.record.clone()))
        } else {
            Ok(None)
        }
    }

    async fn create(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<UserRecord, AppError> {
        if !email.contains('@') {
            return Err(AppError::ValidationError("Invalid email address".into()));
        }
        if password.len() < 8 {
            return Err(AppError::ValidationError(
                "Password must be at least 8 characters".into(),
            ));
        }

        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(AppError::ValidationError("Email already registered".into()));
        }

        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);

        let record = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: display_name.map(|s| s.to_string()),
        };
        users.insert(
            email.to_string(),
            StoredUser {
                record: record.clone(),
                salt,
                password_hash: Self::hash_password(&salt, password),
            },
        );

        Ok(record)
    }
}
