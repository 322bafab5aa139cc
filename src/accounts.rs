//! Cached retrieval of per-account transaction and balance data.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::{FetchCache, daily};
use crate::categorize::categorize_all;
use crate::db::storage::Storage;
use crate::error::BudgetError;
use crate::normalize::{
    NormalizedBalance, NormalizedTransaction, normalize_balances, normalize_transactions,
};
use crate::provider::ProviderClient;
use crate::token::Token;

/// Everything known about one linked account at a point in time.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub account_id: String,
    pub transactions: Vec<NormalizedTransaction>,
    pub balances: Vec<NormalizedBalance>,
    pub last_updated: DateTime<Utc>,
}

/// Balance types worth persisting, most authoritative first.
const BALANCE_TYPE_PREFERENCE: [&str; 2] = ["interimAvailable", "closingBooked"];

/// The single balance to persist: the latest reference date, with same-date
/// ties broken by [`BALANCE_TYPE_PREFERENCE`], then by payload order.
/// Expects `balances` sorted by date, as `normalize_balances` returns them.
fn latest_balance(balances: &[NormalizedBalance]) -> Option<&NormalizedBalance> {
    let last_date = balances.last()?.reference_date;
    let same_day: Vec<&NormalizedBalance> = balances
        .iter()
        .filter(|b| b.reference_date == last_date)
        .collect();
    for preferred in BALANCE_TYPE_PREFERENCE {
        if let Some(found) = same_day
            .iter()
            .find(|b| b.balance_type.as_deref() == Some(preferred))
        {
            return Some(found);
        }
    }
    same_day.first().copied()
}

/// Fetches account data through the daily cache and normalizes it.
pub struct AccountDataFetcher {
    client: ProviderClient,
    storage: Storage,
    cache: FetchCache,
}

impl AccountDataFetcher {
    pub fn new(client: ProviderClient, storage: Storage) -> Self {
        Self {
            client,
            storage,
            cache: FetchCache::new(),
        }
    }

    /// Transactions and balances for one account, categorized and typed.
    ///
    /// Raw payloads are cached for a day per account; the provider's data
    /// moves slowly and these are its most expensive endpoints. The latest
    /// balance is also persisted for the account.
    pub async fn snapshot(
        &mut self,
        token: &Token,
        account_id: &str,
        account_row_id: i64,
    ) -> Result<AccountSnapshot, BudgetError> {
        let now = Utc::now();

        let raw_txns = match self.cache.get("transactions", account_id, now) {
            Some(v) => v.clone(),
            None => {
                let v = self
                    .client
                    .account_transactions(&token.access, account_id)
                    .await?;
                self.cache
                    .put("transactions", account_id, v.clone(), daily(), now);
                v
            }
        };
        let raw_balances = match self.cache.get("balances", account_id, now) {
            Some(v) => v.clone(),
            None => {
                let v = self
                    .client
                    .account_balances(&token.access, account_id)
                    .await?;
                self.cache
                    .put("balances", account_id, v.clone(), daily(), now);
                v
            }
        };

        let mut transactions = normalize_transactions(&raw_txns)?;
        categorize_all(&mut transactions);
        let balances = normalize_balances(&raw_balances)?;

        if let Some(latest) = latest_balance(&balances) {
            debug!(
                account_id = %account_id,
                date = %latest.reference_date,
                balance_type = latest.balance_type.as_deref().unwrap_or("unknown"),
                "persisting latest balance"
            );
            self.storage
                .upsert_balance(account_row_id, latest.amount, now)
                .await?;
        }

        Ok(AccountSnapshot {
            account_id: account_id.to_string(),
            transactions,
            balances,
            last_updated: now,
        })
    }

    /// Drop all cached payloads (e.g. on logout).
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn bal(day: u32, balance_type: &str, amount: &str) -> NormalizedBalance {
        NormalizedBalance {
            reference_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            amount: Decimal::from_str(amount).unwrap(),
            currency: None,
            balance_type: Some(balance_type.to_string()),
            raw: Default::default(),
        }
    }

    #[test]
    fn latest_balance_prefers_interim_available_on_same_day() {
        let balances = vec![
            bal(1, "closingBooked", "80.00"),
            bal(2, "closingBooked", "95.00"),
            bal(2, "interimAvailable", "100.00"),
        ];
        let picked = latest_balance(&balances).unwrap();
        assert_eq!(picked.amount, Decimal::from_str("100.00").unwrap());
        assert_eq!(picked.balance_type.as_deref(), Some("interimAvailable"));
    }

    #[test]
    fn latest_balance_falls_back_to_first_record_of_the_day() {
        let balances = vec![bal(2, "openingBooked", "42.00"), bal(2, "forwardAvailable", "41.00")];
        let picked = latest_balance(&balances).unwrap();
        assert_eq!(picked.amount, Decimal::from_str("42.00").unwrap());
    }

    #[test]
    fn latest_balance_on_empty_list_is_none() {
        assert!(latest_balance(&[]).is_none());
    }
}
