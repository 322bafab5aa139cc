//! The bank-linking (requisition) state machine.
//!
//! CREATED -> (user consents out-of-band) -> LINKED -> EXPIRED | REVOKED.
//! The transition to LINKED happens on the provider's side; this engine only
//! observes it by polling `resolve_accounts`.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use url::Url;

use crate::db::models::{AccountRow, RequisitionRow};
use crate::db::storage::Storage;
use crate::error::BudgetError;
use crate::provider::{Institution, ProviderClient};
use crate::token::Token;

/// Provider-reported consent windows last 90 days from creation.
pub const REQUISITION_VALIDITY_DAYS: i64 = 90;

/// Accounts a requisition has resolved to. Empty while the user has not yet
/// completed authorization, which is not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAccounts {
    pub requisition_id: String,
    pub account_ids: Vec<String>,
}

pub struct RequisitionEngine {
    client: ProviderClient,
    storage: Storage,
    redirect: Url,
}

impl RequisitionEngine {
    pub fn new(client: ProviderClient, storage: Storage, redirect: Url) -> Self {
        Self {
            client,
            storage,
            redirect,
        }
    }

    /// Where the provider sends the user after granting consent.
    pub fn redirect(&self) -> &Url {
        &self.redirect
    }

    /// Institutions available for linking in a 2-letter country code.
    /// Provider rejection (e.g. a stale access token) propagates as-is so the
    /// caller can refresh or re-authenticate.
    pub async fn list_providers(
        &self,
        token: &Token,
        country: &str,
    ) -> Result<Vec<Institution>, BudgetError> {
        self.client.institutions(&token.access, country).await
    }

    /// Open a new linking request and persist the local row.
    ///
    /// Returns the URL the end user must visit to grant consent. Calling this
    /// twice creates two distinct requisitions; the provider offers no
    /// idempotency and neither does this engine.
    pub async fn create_requisition(
        &self,
        token: &Token,
        institution_id: &str,
        username: &str,
    ) -> Result<String, BudgetError> {
        let resp = self
            .client
            .requisition_create(&token.access, institution_id, self.redirect.as_str())
            .await?;
        let expiry = resp.created + Duration::days(REQUISITION_VALIDITY_DAYS);
        self.storage
            .insert_requisition(username, &resp.id, expiry)
            .await?;
        info!(
            requisition_id = %resp.id,
            institution_id = %institution_id,
            expiry = %expiry,
            "requisition created"
        );
        resp.link.ok_or_else(|| {
            BudgetError::Normalization("requisition response missing consent link".to_string())
        })
    }

    /// Poll the provider for the accounts a requisition has resolved to.
    pub async fn resolve_accounts(
        &self,
        token: &Token,
        requisition_id: &str,
    ) -> Result<ResolvedAccounts, BudgetError> {
        let resp = self
            .client
            .requisition_get(&token.access, requisition_id)
            .await?;
        if resp.accounts.is_empty() {
            info!(requisition_id = %resp.id, "requisition not yet authorized");
        }
        Ok(ResolvedAccounts {
            requisition_id: resp.id,
            account_ids: resp.accounts,
        })
    }

    /// Persist one resolved account against its requisition.
    pub async fn save_account(
        &self,
        account_id: &str,
        requisition_id: &str,
    ) -> Result<i64, BudgetError> {
        self.storage.insert_account(account_id, requisition_id).await
    }

    /// All accounts linked by a user, across requisitions.
    pub async fn load_accounts(&self, username: &str) -> Result<Vec<AccountRow>, BudgetError> {
        self.storage.list_accounts(username).await
    }

    /// All requisitions a user holds, oldest first.
    pub async fn load_requisitions(
        &self,
        username: &str,
    ) -> Result<Vec<RequisitionRow>, BudgetError> {
        self.storage.list_requisitions(username).await
    }

    /// Whether a requisition is past its consent window.
    pub fn is_expired(row: &RequisitionRow, now: DateTime<Utc>) -> bool {
        now >= row.expiry
    }

    /// Revoke a requisition upstream, then drop the user's local rows.
    ///
    /// When the remote call is rejected the local rows are intentionally kept:
    /// they are the only record of a consent that may still be live upstream.
    /// `local_only` skips the remote call for requisitions already revoked on
    /// the provider's side.
    pub async fn delete_requisition(
        &self,
        token: &Token,
        username: &str,
        requisition_id: &str,
        local_only: bool,
    ) -> Result<u64, BudgetError> {
        if !local_only {
            self.client
                .requisition_delete(&token.access, requisition_id)
                .await?;
            info!(requisition_id = %requisition_id, "requisition revoked upstream");
        } else {
            warn!(requisition_id = %requisition_id, "local-only delete, skipping remote revoke");
        }
        self.storage.delete_requisitions_for_user(username).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_ninety_days_out() {
        let created = Utc::now();
        let row = RequisitionRow {
            id: 1,
            requisition_id: "req-1".to_string(),
            expiry: created + Duration::days(REQUISITION_VALIDITY_DAYS),
        };
        assert!(!RequisitionEngine::is_expired(&row, created + Duration::days(89)));
        assert!(RequisitionEngine::is_expired(&row, created + Duration::days(90)));
    }
}
