//! Category budget engine: closed category enumeration, allocation with a
//! running remainder, persistence and transaction aggregation.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

use crate::db::storage::Storage;
use crate::error::BudgetError;
use crate::normalize::NormalizedTransaction;

/// The fixed budget categories. Ids are stable for the system's lifetime;
/// the persisted `categories` table is reconciled against this definition on
/// every startup and fully reseeded on any mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    BankFees,
    Cash,
    Entertainment,
    FoodAndDrink,
    Health,
    Insurance,
    Loan,
    Refund,
    Salary,
    SavingsAndInvestments,
    Services,
    Shopping,
    Tax,
    Transfers,
    Transport,
    Travel,
    Utilities,
    Other,
}

impl Category {
    /// Allocation walks this list in order; `Other` is deliberately last.
    pub const ALL: [Category; 18] = [
        Category::BankFees,
        Category::Cash,
        Category::Entertainment,
        Category::FoodAndDrink,
        Category::Health,
        Category::Insurance,
        Category::Loan,
        Category::Refund,
        Category::Salary,
        Category::SavingsAndInvestments,
        Category::Services,
        Category::Shopping,
        Category::Tax,
        Category::Transfers,
        Category::Transport,
        Category::Travel,
        Category::Utilities,
        Category::Other,
    ];

    pub fn id(&self) -> i64 {
        match self {
            Category::BankFees => 1,
            Category::Cash => 2,
            Category::Entertainment => 3,
            Category::FoodAndDrink => 4,
            Category::Health => 5,
            Category::Insurance => 6,
            Category::Loan => 7,
            Category::Refund => 8,
            Category::Salary => 9,
            Category::SavingsAndInvestments => 10,
            Category::Services => 11,
            Category::Shopping => 12,
            Category::Tax => 13,
            Category::Transfers => 14,
            Category::Transport => 15,
            Category::Travel => 16,
            Category::Utilities => 17,
            Category::Other => 99,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::BankFees => "Bank Fees",
            Category::Cash => "Cash",
            Category::Entertainment => "Entertainment",
            Category::FoodAndDrink => "Food and Drink",
            Category::Health => "Health",
            Category::Insurance => "Insurance",
            Category::Loan => "Loan",
            Category::Refund => "Refund",
            Category::Salary => "Salary",
            Category::SavingsAndInvestments => "Savings and investments",
            Category::Services => "Services",
            Category::Shopping => "Shopping",
            Category::Tax => "Tax",
            Category::Transfers => "Transfers",
            Category::Transport => "Transport",
            Category::Travel => "Travel",
            Category::Utilities => "Utilities",
            Category::Other => "Other",
        }
    }

    pub fn from_label(label: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.label() == label)
    }

    pub fn from_id(id: i64) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.id() == id)
    }

    /// Refund and Salary only ever appear on the income side and never
    /// accept a budget allocation.
    pub fn is_income_only(&self) -> bool {
        matches!(self, Category::Refund | Category::Salary)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregation bucket: a real category, or the explicit bucket for
/// transactions the categorizer could not place. Uncategorized amounts are
/// reported, never dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Category(Category),
    Uncategorized,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Category(c) => f.write_str(c.label()),
            Bucket::Uncategorized => f.write_str("Uncategorized"),
        }
    }
}

/// Sums of normalized transactions partitioned by amount sign and grouped by
/// bucket. Income sums are non-negative, spending sums non-positive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateReport {
    pub income: BTreeMap<Bucket, Decimal>,
    pub spending: BTreeMap<Bucket, Decimal>,
}

/// Allocate a monthly income across the fixed category list.
///
/// Categories are walked in id order. Income-only categories are skipped.
/// Every ordinary category's input is bounded to `[0, remaining]` and
/// decrements the running remainder. `Other` resolves last and absorbs up to
/// the entire remainder; when no `Other` input is given it takes everything
/// left. The bounds make over-allocation unrepresentable.
pub fn allocate(
    monthly_income: Decimal,
    inputs: &BTreeMap<Category, Decimal>,
) -> BTreeMap<Category, Decimal> {
    let mut remaining = monthly_income.max(Decimal::ZERO);
    let mut out = BTreeMap::new();

    for category in Category::ALL {
        if category.is_income_only() || category == Category::Other {
            continue;
        }
        let requested = inputs.get(&category).copied().unwrap_or(Decimal::ZERO);
        let amount = requested.max(Decimal::ZERO).min(remaining);
        remaining -= amount;
        out.insert(category, amount);
    }

    // Other is resolved last; its upper bound is whatever income remains.
    let requested = inputs
        .get(&Category::Other)
        .copied()
        .unwrap_or(remaining);
    let amount = requested.max(Decimal::ZERO).min(remaining);
    out.insert(Category::Other, amount);
    out
}

/// Partition normalized transactions by amount sign and sum per bucket.
/// Positive (and zero) amounts count as income, negative as spending.
pub fn aggregate(transactions: &[NormalizedTransaction]) -> AggregateReport {
    let mut report = AggregateReport::default();
    for txn in transactions {
        let bucket = txn
            .category
            .map(Bucket::Category)
            .unwrap_or(Bucket::Uncategorized);
        let side = if txn.amount < Decimal::ZERO {
            &mut report.spending
        } else {
            &mut report.income
        };
        *side.entry(bucket).or_insert(Decimal::ZERO) += txn.amount;
    }
    report
}

/// Persistence-facing half of the budget engine.
pub struct BudgetEngine {
    storage: Storage,
}

impl BudgetEngine {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Validate the persisted category table against [`Category::ALL`].
    ///
    /// Any mismatch (missing, renamed or renumbered entry) triggers a full
    /// reseed: the code-defined set is authoritative and partial patches are
    /// never attempted. Returns whether a reseed happened; running twice in a
    /// row is a no-op the second time.
    pub async fn reconcile_categories(&self) -> Result<bool, BudgetError> {
        let expected: Vec<(i64, &str)> =
            Category::ALL.iter().map(|c| (c.id(), c.label())).collect();
        let persisted = self.storage.fetch_categories().await?;
        let matches = persisted.len() == expected.len()
            && persisted
                .iter()
                .zip(expected.iter())
                .all(|((pid, plabel), (eid, elabel))| pid == eid && plabel == elabel);
        if matches {
            return Ok(false);
        }
        warn!(
            persisted = persisted.len(),
            expected = expected.len(),
            "category table out of sync, reseeding"
        );
        self.storage.reseed_categories(&expected).await?;
        Ok(true)
    }

    /// Stored allocations for a user. A user who never saved a budget gets
    /// an empty map, not an error.
    pub async fn load_budget(
        &self,
        username: &str,
    ) -> Result<BTreeMap<Category, Decimal>, BudgetError> {
        let rows = self.storage.load_budget(username).await?;
        let mut out = BTreeMap::new();
        for (label, amount) in rows {
            let category = Category::from_label(&label).ok_or_else(|| {
                BudgetError::Normalization(format!("unknown persisted category {label:?}"))
            })?;
            out.insert(category, amount);
        }
        Ok(out)
    }

    /// Upsert every allocation by (user, category), inside one transaction.
    pub async fn save_budget(
        &self,
        allocations: &BTreeMap<Category, Decimal>,
        username: &str,
    ) -> Result<(), BudgetError> {
        let user = self
            .storage
            .get_user(username)
            .await?
            .ok_or(BudgetError::Authentication)?;
        let rows: Vec<(i64, Decimal)> = allocations
            .iter()
            .map(|(category, amount)| (category.id(), *amount))
            .collect();
        self.storage.save_budget(user.id, &rows).await?;
        info!(username = %username, categories = rows.len(), "budget saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::TransactionStatus;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn txn(amount: &str, category: Option<Category>) -> NormalizedTransaction {
        NormalizedTransaction {
            status: TransactionStatus::Booked,
            booking_date: None,
            value_date: None,
            amount: dec(amount),
            currency: None,
            counterparty: None,
            description: None,
            category,
            raw: Default::default(),
        }
    }

    #[test]
    fn other_absorbs_the_remainder() {
        let mut inputs = BTreeMap::new();
        inputs.insert(Category::FoodAndDrink, dec("200"));
        inputs.insert(Category::Health, dec("100"));
        inputs.insert(Category::Other, dec("700"));
        let allocations = allocate(dec("1000"), &inputs);
        assert_eq!(allocations[&Category::Other], dec("700"));
        let total: Decimal = allocations.values().copied().sum();
        assert_eq!(total, dec("1000"));
    }

    #[test]
    fn missing_other_input_takes_everything_left() {
        let mut inputs = BTreeMap::new();
        inputs.insert(Category::FoodAndDrink, dec("250"));
        let allocations = allocate(dec("1000"), &inputs);
        assert_eq!(allocations[&Category::Other], dec("750"));
    }

    #[test]
    fn inputs_clamp_to_remaining_income() {
        let mut inputs = BTreeMap::new();
        inputs.insert(Category::BankFees, dec("800"));
        inputs.insert(Category::FoodAndDrink, dec("500"));
        let allocations = allocate(dec("1000"), &inputs);
        assert_eq!(allocations[&Category::BankFees], dec("800"));
        assert_eq!(allocations[&Category::FoodAndDrink], dec("200"));
        assert_eq!(allocations[&Category::Other], dec("0"));
    }

    #[test]
    fn negative_inputs_clamp_to_zero() {
        let mut inputs = BTreeMap::new();
        inputs.insert(Category::Travel, dec("-50"));
        inputs.insert(Category::Other, dec("0"));
        let allocations = allocate(dec("100"), &inputs);
        assert_eq!(allocations[&Category::Travel], dec("0"));
    }

    #[test]
    fn income_only_categories_never_allocated() {
        let mut inputs = BTreeMap::new();
        inputs.insert(Category::Salary, dec("500"));
        inputs.insert(Category::Refund, dec("100"));
        let allocations = allocate(dec("1000"), &inputs);
        assert!(!allocations.contains_key(&Category::Salary));
        assert!(!allocations.contains_key(&Category::Refund));
    }

    #[test]
    fn aggregate_partitions_by_sign() {
        let txns = [
            txn("50", Some(Category::FoodAndDrink)),
            txn("-30", Some(Category::FoodAndDrink)),
        ];
        let report = aggregate(&txns);
        assert_eq!(
            report.income[&Bucket::Category(Category::FoodAndDrink)],
            dec("50")
        );
        assert_eq!(
            report.spending[&Bucket::Category(Category::FoodAndDrink)],
            dec("-30")
        );
    }

    #[test]
    fn uncategorized_transactions_are_not_dropped() {
        let txns = [txn("-15", None), txn("20", None)];
        let report = aggregate(&txns);
        assert_eq!(report.spending[&Bucket::Uncategorized], dec("-15"));
        assert_eq!(report.income[&Bucket::Uncategorized], dec("20"));
    }

    async fn memory_storage() -> Storage {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let storage = Storage::new(pool);
        storage.init_schema().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn reconcile_seeds_empty_table_and_is_idempotent() {
        let storage = memory_storage().await;
        let engine = BudgetEngine::new(storage.clone());
        assert!(engine.reconcile_categories().await.unwrap());
        assert!(!engine.reconcile_categories().await.unwrap());
        let persisted = storage.fetch_categories().await.unwrap();
        assert_eq!(persisted.len(), Category::ALL.len());
        assert_eq!(persisted[0], (1, "Bank Fees".to_string()));
        assert_eq!(persisted.last().unwrap(), &(99, "Other".to_string()));
    }

    #[tokio::test]
    async fn reconcile_replaces_drifted_table_exactly() {
        let storage = memory_storage().await;
        let engine = BudgetEngine::new(storage.clone());
        engine.reconcile_categories().await.unwrap();
        // Simulate a rename drift in a single entry.
        sqlx::query("UPDATE categories SET category = 'Groceries' WHERE id = 4")
            .execute(storage.pool())
            .await
            .unwrap();
        assert!(engine.reconcile_categories().await.unwrap());
        let persisted = storage.fetch_categories().await.unwrap();
        assert!(persisted.contains(&(4, "Food and Drink".to_string())));
    }

    #[tokio::test]
    async fn budget_round_trip_and_upsert() {
        let storage = memory_storage().await;
        let engine = BudgetEngine::new(storage.clone());
        engine.reconcile_categories().await.unwrap();
        storage
            .insert_user(b"uid-0000-0000-16", "frida", "argon2-hash", b"salt-16-bytes-xx")
            .await
            .unwrap();

        assert!(engine.load_budget("frida").await.unwrap().is_empty());

        let mut inputs = BTreeMap::new();
        inputs.insert(Category::FoodAndDrink, dec("200"));
        inputs.insert(Category::Other, dec("50"));
        let allocations = allocate(dec("250"), &inputs);
        engine.save_budget(&allocations, "frida").await.unwrap();

        let loaded = engine.load_budget("frida").await.unwrap();
        assert_eq!(loaded[&Category::FoodAndDrink], dec("200"));
        assert_eq!(loaded[&Category::Other], dec("50"));

        // Second save updates in place rather than inserting duplicates.
        let mut inputs = BTreeMap::new();
        inputs.insert(Category::FoodAndDrink, dec("120"));
        inputs.insert(Category::Other, dec("130"));
        let allocations = allocate(dec("250"), &inputs);
        engine.save_budget(&allocations, "frida").await.unwrap();
        let loaded = engine.load_budget("frida").await.unwrap();
        assert_eq!(loaded[&Category::FoodAndDrink], dec("120"));
    }
}
