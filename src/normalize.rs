//! Normalization of heterogeneous provider JSON into flat, typed records.
//!
//! The provider nests fields under dot-path objects and splits transactions
//! into separate "pending" and "booked" buckets. Downstream aggregation wants
//! one ordered sequence of flat records with typed dates and amounts, so all
//! the flattening and coercion happens here and nowhere else.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::budget::Category;
use crate::error::BudgetError;

/// Which provider bucket a transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Booked,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Booked => "booked",
        }
    }
}

/// One flat, typed transaction record. Derived per request, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTransaction {
    pub status: TransactionStatus,
    pub booking_date: Option<NaiveDate>,
    pub value_date: Option<NaiveDate>,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub counterparty: Option<String>,
    pub description: Option<String>,
    /// Assigned by the categorizer after normalization; `None` aggregates
    /// under the explicit uncategorized bucket.
    pub category: Option<Category>,
    /// Every flattened field of the source record, untouched.
    pub raw: BTreeMap<String, Value>,
}

/// One flat balance record. A single reference date routinely carries
/// several records of different balance types; all of them are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBalance {
    pub reference_date: NaiveDate,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub balance_type: Option<String>,
    pub raw: BTreeMap<String, Value>,
}

/// Union the provider's pending and booked lists into one ordered sequence
/// of typed records, pending first, each tagged with its status.
///
/// Missing `transactions.pending` or `transactions.booked` keys and malformed
/// numeric strings fail with `Normalization`; there is no silent
/// empty-result fallback.
pub fn normalize_transactions(
    payload: &Value,
) -> Result<Vec<NormalizedTransaction>, BudgetError> {
    let buckets = payload
        .get("transactions")
        .and_then(Value::as_object)
        .ok_or_else(|| missing("transactions"))?;

    let mut out = Vec::new();
    for (status, key) in [
        (TransactionStatus::Pending, "pending"),
        (TransactionStatus::Booked, "booked"),
    ] {
        let list = buckets
            .get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| missing(&format!("transactions.{key}")))?;
        for entry in list {
            out.push(normalize_one(entry, status)?);
        }
    }
    Ok(out)
}

fn normalize_one(
    entry: &Value,
    status: TransactionStatus,
) -> Result<NormalizedTransaction, BudgetError> {
    let raw = flatten(entry)?;
    let amount = raw
        .get("transactionAmount_amount")
        .ok_or_else(|| missing("transactionAmount_amount"))
        .and_then(coerce_decimal)?;
    let counterparty = string_field(&raw, "creditorName")
        .or_else(|| string_field(&raw, "debtorName"));
    Ok(NormalizedTransaction {
        status,
        booking_date: date_field(&raw, "bookingDate")?,
        value_date: date_field(&raw, "valueDate")?,
        amount,
        currency: string_field(&raw, "transactionAmount_currency"),
        counterparty,
        description: string_field(&raw, "remittanceInformationUnstructured"),
        category: None,
        raw,
    })
}

/// Flatten the provider's balances list, ordered by reference date.
///
/// Same-date records of different balance types are all preserved; a
/// consumer that wants one balance per day must choose a type itself.
pub fn normalize_balances(payload: &Value) -> Result<Vec<NormalizedBalance>, BudgetError> {
    let list = payload
        .get("balances")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("balances"))?;

    let mut out = Vec::with_capacity(list.len());
    for entry in list {
        let raw = flatten(entry)?;
        let reference_date = date_field(&raw, "referenceDate")?
            .ok_or_else(|| missing("referenceDate"))?;
        let amount = raw
            .get("balanceAmount_amount")
            .ok_or_else(|| missing("balanceAmount_amount"))
            .and_then(coerce_decimal)?;
        out.push(NormalizedBalance {
            reference_date,
            amount,
            currency: string_field(&raw, "balanceAmount_currency"),
            balance_type: string_field(&raw, "balanceType"),
            raw,
        });
    }
    // Stable: payload order is kept within a date.
    out.sort_by_key(|b| b.reference_date);
    Ok(out)
}

/// Flatten nested objects into `_`-joined flat keys. Arrays and scalars are
/// kept as-is.
fn flatten(entry: &Value) -> Result<BTreeMap<String, Value>, BudgetError> {
    let obj = entry
        .as_object()
        .ok_or_else(|| BudgetError::Normalization("record is not an object".to_string()))?;
    let mut out = BTreeMap::new();
    flatten_into(obj, None, &mut out);
    Ok(out)
}

fn flatten_into(obj: &Map<String, Value>, prefix: Option<&str>, out: &mut BTreeMap<String, Value>) {
    for (key, value) in obj {
        let flat_key = match prefix {
            Some(p) => format!("{p}_{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten_into(nested, Some(&flat_key), out),
            other => {
                out.insert(flat_key, other.clone());
            }
        }
    }
}

fn coerce_decimal(value: &Value) -> Result<Decimal, BudgetError> {
    match value {
        Value::String(s) => Decimal::from_str(s)
            .map_err(|e| BudgetError::Normalization(format!("malformed amount {s:?}: {e}"))),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .map_err(|e| BudgetError::Normalization(format!("malformed amount {n}: {e}"))),
        other => Err(BudgetError::Normalization(format!(
            "amount is not numeric: {other}"
        ))),
    }
}

fn date_field(
    raw: &BTreeMap<String, Value>,
    key: &str,
) -> Result<Option<NaiveDate>, BudgetError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| BudgetError::Normalization(format!("malformed date {s:?}: {e}"))),
        Some(other) => Err(BudgetError::Normalization(format!(
            "{key} is not a date string: {other}"
        ))),
    }
}

fn string_field(raw: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

fn missing(key: &str) -> BudgetError {
    BudgetError::Normalization(format!("missing expected key {key:?}"))
}
