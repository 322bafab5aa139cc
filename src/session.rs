//! Explicit per-login session context.
//!
//! The current user and their token cipher live here and are passed to
//! operations explicitly. A session is created at login, dropped at logout,
//! and never reused across users.

use tracing::info;
use uuid::Uuid;

use crate::auth::Authenticator;
use crate::crypto::TokenCipher;
use crate::error::BudgetError;

pub struct Session {
    username: String,
    user_id: Uuid,
    cipher: TokenCipher,
}

impl Session {
    /// Authenticate and derive the token cipher from the user's salt and the
    /// installation secret key.
    pub async fn login(
        auth: &Authenticator,
        username: &str,
        password: &str,
        secret_key: &str,
    ) -> Result<Self, BudgetError> {
        let outcome = auth.login(username, password).await?;
        let cipher = TokenCipher::derive(&outcome.salt, secret_key)?;
        info!(username = %username, "session opened");
        Ok(Self {
            username: username.to_string(),
            user_id: outcome.user_id,
            cipher,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn cipher(&self) -> &TokenCipher {
        &self.cipher
    }

    /// Tear the session down. Consuming self makes reuse impossible.
    pub fn logout(self) {
        info!(username = %self.username, "session closed");
    }
}
