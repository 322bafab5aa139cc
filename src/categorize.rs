//! Deterministic category rules for normalized transactions.
//!
//! Keyword matching over description and counterparty text covers the common
//! cases; anything unmatched stays uncategorized and is reported as such by
//! the aggregation side.

use rust_decimal::Decimal;

use crate::budget::Category;
use crate::normalize::NormalizedTransaction;

/// Assign a category to every transaction that matches a rule.
/// Already-categorized transactions are left alone.
pub fn categorize_all(transactions: &mut [NormalizedTransaction]) {
    for txn in transactions {
        if txn.category.is_none() {
            txn.category = categorize(txn);
        }
    }
}

/// Deterministically categorize one transaction.
/// Priority: description keywords, then counterparty keywords, then amount
/// sign for salary-like credits.
pub fn categorize(txn: &NormalizedTransaction) -> Option<Category> {
    let mut haystack = String::new();
    if let Some(desc) = &txn.description {
        haystack.push_str(&desc.to_uppercase());
        haystack.push(' ');
    }
    if let Some(cp) = &txn.counterparty {
        haystack.push_str(&cp.to_uppercase());
    }
    if haystack.trim().is_empty() {
        return None;
    }

    if contains_any(&haystack, &["SALARY", "PAYROLL", "WAGES"]) && txn.amount > Decimal::ZERO {
        return Some(Category::Salary);
    }
    if contains_any(&haystack, &["REFUND", "REIMBURSEMENT"]) && txn.amount > Decimal::ZERO {
        return Some(Category::Refund);
    }
    if contains_any(&haystack, &["ATM", "CASH WITHDRAWAL", "CASHPOINT"]) {
        return Some(Category::Cash);
    }
    if contains_any(&haystack, &["FEE", "CHARGE", "OVERDRAFT"]) {
        return Some(Category::BankFees);
    }
    if contains_any(
        &haystack,
        &["SUPERMARKET", "GROCER", "RESTAURANT", "COFFEE", "CAFE", "BAKERY", "DELIVEROO"],
    ) {
        return Some(Category::FoodAndDrink);
    }
    if contains_any(&haystack, &["PHARMACY", "CLINIC", "DENTIST", "HOSPITAL", "GYM"]) {
        return Some(Category::Health);
    }
    if contains_any(&haystack, &["INSURANCE", "PREMIUM"]) {
        return Some(Category::Insurance);
    }
    if contains_any(&haystack, &["LOAN", "MORTGAGE", "REPAYMENT"]) {
        return Some(Category::Loan);
    }
    if contains_any(&haystack, &["SAVINGS", "VANGUARD", "BROKER", "INVEST"]) {
        return Some(Category::SavingsAndInvestments);
    }
    if contains_any(
        &haystack,
        &["NETFLIX", "SPOTIFY", "SUBSCRIPTION", "STREAMING", "CINEMA", "TICKET"],
    ) {
        return Some(Category::Entertainment);
    }
    if contains_any(&haystack, &["TAX", "HMRC", "REVENUE"]) {
        return Some(Category::Tax);
    }
    if contains_any(&haystack, &["TRANSFER", "STANDING ORDER"]) {
        return Some(Category::Transfers);
    }
    if contains_any(
        &haystack,
        &["RAIL", "TRAIN", "METRO", "BUS ", "UBER", "FUEL", "PETROL", "PARKING"],
    ) {
        return Some(Category::Transport);
    }
    if contains_any(&haystack, &["AIRLINE", "AIRWAYS", "HOTEL", "HOSTEL", "BOOKING.COM"]) {
        return Some(Category::Travel);
    }
    if contains_any(&haystack, &["ELECTRIC", "GAS ", "WATER", "BROADBAND", "ENERGY"]) {
        return Some(Category::Utilities);
    }
    if contains_any(&haystack, &["AMAZON", "STORE", "RETAIL", "SHOP"]) {
        return Some(Category::Shopping);
    }
    None
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
