use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

use crate::db::models::{AccountRow, RequisitionRow, TokenRow, UserRow};
use crate::db::schema::SQLITE_INIT;
use crate::error::BudgetError;

pub type SqlitePool = Pool<Sqlite>;

/// Keyed CRUD over the local SQLite store.
///
/// Every method is a single statement or a single small transaction; there is
/// no cross-operation transaction spanning, matching the request/response
/// model of the rest of the crate.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), BudgetError> {
        // sqlx::query runs one statement at a time; split the bundled DDL.
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ---- users ----

    pub async fn insert_user(
        &self,
        user_id: &[u8],
        username: &str,
        password_hash: &str,
        salt: &[u8],
    ) -> Result<i64, BudgetError> {
        let res = sqlx::query(
            "INSERT INTO users (user_id, username, password, salt) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(username)
        .bind(password_hash)
        .bind(salt)
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    pub async fn get_user(&self, username: &str) -> Result<Option<UserRow>, BudgetError> {
        let row = sqlx::query(
            "SELECT id, user_id, username, password, salt FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_user).transpose()
    }

    // ---- tokens (single-row table, id fixed to 1) ----

    /// Replace the one persisted token row. A save always supersedes the
    /// prior row since only one provider credential set is supported.
    pub async fn replace_token(&self, row: &TokenRow) -> Result<(), BudgetError> {
        sqlx::query(
            "REPLACE INTO tokens (id, access, access_expires, refresh, refresh_expires)
             VALUES (1, ?, ?, ?, ?)",
        )
        .bind(row.access.as_slice())
        .bind(row.access_expires.to_rfc3339())
        .bind(row.refresh.as_slice())
        .bind(row.refresh_expires.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fetch_token(&self) -> Result<Option<TokenRow>, BudgetError> {
        let row = sqlx::query(
            "SELECT access, access_expires, refresh, refresh_expires FROM tokens WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_token).transpose()
    }

    pub async fn delete_token(&self) -> Result<(), BudgetError> {
        sqlx::query("DELETE FROM tokens WHERE id = 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- requisitions ----

    pub async fn insert_requisition(
        &self,
        username: &str,
        requisition_id: &str,
        expiry: DateTime<Utc>,
    ) -> Result<i64, BudgetError> {
        let res = sqlx::query(
            "INSERT INTO requisitions (users_id, requisition_id, expiry)
             VALUES ((SELECT id FROM users WHERE username = ?), ?, ?)",
        )
        .bind(username)
        .bind(requisition_id)
        .bind(expiry.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    pub async fn list_requisitions(
        &self,
        username: &str,
    ) -> Result<Vec<RequisitionRow>, BudgetError> {
        let rows = sqlx::query(
            "SELECT requisitions.id, requisition_id, expiry FROM requisitions
             JOIN users ON users.id = requisitions.users_id
             WHERE username = ? ORDER BY requisitions.id",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_requisition).collect()
    }

    /// Delete every local requisition row held by `username`.
    pub async fn delete_requisitions_for_user(&self, username: &str) -> Result<u64, BudgetError> {
        let res = sqlx::query(
            "DELETE FROM requisitions
             WHERE users_id IN (SELECT id FROM users WHERE username = ?)",
        )
        .bind(username)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    // ---- accounts ----

    pub async fn insert_account(
        &self,
        account_id: &str,
        requisition_id: &str,
    ) -> Result<i64, BudgetError> {
        let res = sqlx::query(
            "INSERT INTO accounts (account_id, requisition_id)
             VALUES (?, (SELECT id FROM requisitions WHERE requisition_id = ?))",
        )
        .bind(account_id)
        .bind(requisition_id)
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    pub async fn list_accounts(&self, username: &str) -> Result<Vec<AccountRow>, BudgetError> {
        let rows = sqlx::query(
            "SELECT accounts.id, accounts.account_id, accounts.requisition_id FROM accounts
             JOIN requisitions ON requisitions.id = accounts.requisition_id
             JOIN users ON users.id = requisitions.users_id
             WHERE username = ? ORDER BY accounts.id",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_account).collect()
    }

    // ---- categories ----

    pub async fn fetch_categories(&self) -> Result<Vec<(i64, String)>, BudgetError> {
        let rows = sqlx::query("SELECT id, category FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                let id: i64 = row.try_get("id")?;
                let category: String = row.try_get("category")?;
                Ok((id, category))
            })
            .collect()
    }

    /// Replace the persisted category set with `definitions` exactly.
    /// Full reseed, not a partial patch: one transaction, delete then insert.
    pub async fn reseed_categories(
        &self,
        definitions: &[(i64, &str)],
    ) -> Result<(), BudgetError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM categories").execute(&mut *tx).await?;
        for (id, label) in definitions {
            sqlx::query("INSERT INTO categories (id, category) VALUES (?, ?)")
                .bind(*id)
                .bind(*label)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // ---- budget ----

    pub async fn load_budget(&self, username: &str) -> Result<Vec<(String, Decimal)>, BudgetError> {
        let rows = sqlx::query(
            "SELECT category, amount FROM budget
             JOIN categories ON budget.categories_id = categories.id
             JOIN users ON budget.users_id = users.id
             WHERE username = ? ORDER BY categories.id",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                let category: String = row.try_get("category")?;
                let amount: String = row.try_get("amount")?;
                let amount = Decimal::from_str(&amount)
                    .map_err(|e| BudgetError::Normalization(format!("bad stored amount: {e}")))?;
                Ok((category, amount))
            })
            .collect()
    }

    /// Upsert one allocation row per (user, category), all inside a single
    /// transaction so a failed save leaves the previous budget intact.
    pub async fn save_budget(
        &self,
        user_row_id: i64,
        allocations: &[(i64, Decimal)],
    ) -> Result<(), BudgetError> {
        let mut tx = self.pool.begin().await?;
        for (category_id, amount) in allocations {
            sqlx::query(
                "INSERT INTO budget (users_id, categories_id, amount) VALUES (?, ?, ?)
                 ON CONFLICT(users_id, categories_id) DO UPDATE SET amount = excluded.amount",
            )
            .bind(user_row_id)
            .bind(category_id)
            .bind(amount.to_string())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // ---- balance ----

    /// Record the latest checked balance for an account (one row per account).
    pub async fn upsert_balance(
        &self,
        account_row_id: i64,
        balance: Decimal,
        last_checked: DateTime<Utc>,
    ) -> Result<(), BudgetError> {
        sqlx::query(
            "INSERT INTO balance (account_id, balance, last_checked) VALUES (?, ?, ?)
             ON CONFLICT(account_id) DO UPDATE SET
                balance = excluded.balance,
                last_checked = excluded.last_checked",
        )
        .bind(account_row_id)
        .bind(balance.to_string())
        .bind(last_checked.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- row mapping ----

    fn row_to_user(row: SqliteRow) -> Result<UserRow, BudgetError> {
        Ok(UserRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            password: row.try_get("password")?,
            salt: row.try_get("salt")?,
        })
    }

    fn row_to_token(row: SqliteRow) -> Result<TokenRow, BudgetError> {
        Ok(TokenRow {
            access: row.try_get("access")?,
            access_expires: Self::parse_timestamp(row.try_get("access_expires")?)?,
            refresh: row.try_get("refresh")?,
            refresh_expires: Self::parse_timestamp(row.try_get("refresh_expires")?)?,
        })
    }

    fn row_to_requisition(row: SqliteRow) -> Result<RequisitionRow, BudgetError> {
        Ok(RequisitionRow {
            id: row.try_get("id")?,
            requisition_id: row.try_get("requisition_id")?,
            expiry: Self::parse_timestamp(row.try_get("expiry")?)?,
        })
    }

    fn row_to_account(row: SqliteRow) -> Result<AccountRow, BudgetError> {
        Ok(AccountRow {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            requisition_id: row.try_get("requisition_id")?,
        })
    }

    fn parse_timestamp(raw: String) -> Result<DateTime<Utc>, BudgetError> {
        let parsed = DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(parsed.with_timezone(&Utc))
    }
}
