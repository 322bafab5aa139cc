//! Authentication collaborator: registration and login against the local
//! user table. The core consumes it only to obtain the per-user salt that
//! feeds cipher derivation.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::RngCore;
use tracing::info;
use uuid::Uuid;

use crate::db::storage::Storage;
use crate::error::BudgetError;

/// What a successful login hands back: the opaque user id and the immutable
/// 16-byte salt generated at registration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub user_id: Uuid,
    pub salt: Vec<u8>,
}

pub struct Authenticator {
    storage: Storage,
}

impl Authenticator {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Register a new user with an argon2 password hash and a fresh salt.
    pub async fn register(&self, username: &str, password: &str) -> Result<(), BudgetError> {
        if self.storage.get_user(username).await?.is_some() {
            return Err(BudgetError::AlreadyRegistered(username.to_string()));
        }
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
            .map_err(|e| BudgetError::Crypto(format!("password hashing failed: {e}")))?
            .to_string();
        let user_id = Uuid::new_v4();
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        self.storage
            .insert_user(user_id.as_bytes(), username, &hash, &salt)
            .await?;
        info!(username = %username, "user registered");
        Ok(())
    }

    /// Verify the password and return the user id and salt.
    /// Wrong username and wrong password fail identically.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, BudgetError> {
        let user = self
            .storage
            .get_user(username)
            .await?
            .ok_or(BudgetError::Authentication)?;
        let parsed = PasswordHash::new(&user.password)
            .map_err(|e| BudgetError::Crypto(format!("corrupt stored hash: {e}")))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| BudgetError::Authentication)?;
        let user_id = Uuid::from_slice(&user.user_id)
            .map_err(|e| BudgetError::Crypto(format!("corrupt stored user id: {e}")))?;
        Ok(LoginOutcome {
            user_id,
            salt: user.salt,
        })
    }
}
