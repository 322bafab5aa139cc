//! Provider token lifecycle: mint, persist encrypted, load, refresh.
//!
//! State machine: ABSENT -> VALID -> EXPIRED_ACCESS -> VALID (after refresh)
//! -> EXPIRED_REFRESH (terminal, full re-auth). Exactly one token row is ever
//! persisted; a save replaces whatever was there.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::crypto::TokenCipher;
use crate::db::models::TokenRow;
use crate::db::storage::Storage;
use crate::error::BudgetError;
use crate::provider::ProviderClient;

/// The provider access/refresh pair with independent expiry clocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub access: String,
    pub access_expires: DateTime<Utc>,
    pub refresh: String,
    pub refresh_expires: DateTime<Utc>,
}

impl Token {
    pub fn is_access_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.access_expires
    }

    pub fn is_refresh_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.refresh_expires
    }
}

/// Owns the single persisted token and the credential pair used to mint it.
pub struct TokenStore {
    client: ProviderClient,
    storage: Storage,
    secret_id: String,
    secret_key: String,
}

impl TokenStore {
    pub fn new(
        client: ProviderClient,
        storage: Storage,
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            storage,
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Mint a brand-new token pair from the installation credentials.
    ///
    /// The provider reports relative "seconds until expiry"; absolute
    /// timestamps are computed against now, minus one second to stay on the
    /// safe side of the provider's clock.
    pub async fn request_token(&self) -> Result<Token, BudgetError> {
        let resp = self
            .client
            .token_new(&self.secret_id, &self.secret_key)
            .await?;
        let now = Utc::now();
        info!("minted new provider token");
        Ok(Token {
            access: resp.access,
            access_expires: now + Duration::seconds(resp.access_expires - 1),
            refresh: resp.refresh,
            refresh_expires: now + Duration::seconds(resp.refresh_expires - 1),
        })
    }

    /// Encrypt both token halves independently and replace the single row.
    pub async fn save_token(
        &self,
        token: &Token,
        cipher: &TokenCipher,
    ) -> Result<(), BudgetError> {
        let row = TokenRow {
            access: cipher.encrypt_str(&token.access)?,
            access_expires: token.access_expires,
            refresh: cipher.encrypt_str(&token.refresh)?,
            refresh_expires: token.refresh_expires,
        };
        self.storage.replace_token(&row).await?;
        debug!("token saved (encrypted at rest)");
        Ok(())
    }

    /// Load the persisted token, transparently refreshing an expired access
    /// half before returning.
    ///
    /// Fails with `NoSavedToken` when no row exists; callers fall back to
    /// `request_token` + `save_token` on that failure and only that one.
    pub async fn load_token(&self, cipher: &TokenCipher) -> Result<Token, BudgetError> {
        let row = self
            .storage
            .fetch_token()
            .await?
            .ok_or(BudgetError::NoSavedToken)?;
        let mut token = Token {
            access: cipher.decrypt_str(&row.access)?,
            access_expires: row.access_expires,
            refresh: cipher.decrypt_str(&row.refresh)?,
            refresh_expires: row.refresh_expires,
        };
        if token.is_access_expired(Utc::now()) {
            debug!("stored access token expired, refreshing");
            self.refresh_token(&mut token).await?;
            self.save_token(&token, cipher).await?;
        }
        Ok(token)
    }

    /// Exchange the refresh token for a new access token, in place.
    ///
    /// When the refresh half itself has expired the session is unrecoverable:
    /// destroy the persisted row, fail with `ExpiredToken` without touching
    /// the network, and leave the caller to mint a brand-new token.
    pub async fn refresh_token(&self, token: &mut Token) -> Result<(), BudgetError> {
        if token.is_refresh_expired(Utc::now()) {
            // The row can never be refreshed again; the next load must miss.
            self.storage.delete_token().await?;
            info!("refresh token expired, destroyed saved token");
            return Err(BudgetError::ExpiredToken);
        }
        let resp = self.client.token_refresh(&token.refresh).await?;
        token.access = resp.access;
        token.access_expires = Utc::now() + Duration::seconds(resp.access_expires - 1);
        info!("access token refreshed");
        Ok(())
    }

    /// The standard startup flow: load the saved token, or mint and save a
    /// fresh one when there is nothing to load.
    pub async fn ensure_token(&self, cipher: &TokenCipher) -> Result<Token, BudgetError> {
        match self.load_token(cipher).await {
            Ok(token) => Ok(token),
            Err(e) if e.is_recoverable_token_miss() => {
                let token = self.request_token().await?;
                self.save_token(&token, cipher).await?;
                Ok(token)
            }
            Err(e) => Err(e),
        }
    }
}
