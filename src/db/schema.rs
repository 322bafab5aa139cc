//! SQL DDL for the local store. SQLite-first design.
//!
//! Idempotent create-if-absent only. The core owns no migrations beyond this.

/// Tables:
/// - `users`: one row per registered user, 16-byte unique salt immutable
/// - `tokens`: at most one row (id fixed to 1), token material encrypted
/// - `requisitions`: many per user, one per linked institution over time
/// - `accounts`: provider account ids resolved from a requisition
/// - `categories`: closed enumeration, reseeded from code on mismatch
/// - `budget`: one row per (user, category) allocation
/// - `balance`: latest checked balance per account
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id BLOB NOT NULL UNIQUE,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    salt BLOB NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS tokens (
    id INTEGER PRIMARY KEY,
    access BLOB NOT NULL,
    access_expires TEXT NOT NULL,
    refresh BLOB NOT NULL,
    refresh_expires TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS requisitions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    users_id INTEGER NOT NULL,
    requisition_id TEXT NOT NULL,
    expiry TEXT NOT NULL,
    FOREIGN KEY (users_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id TEXT NOT NULL UNIQUE,
    requisition_id INTEGER NOT NULL,
    FOREIGN KEY (requisition_id) REFERENCES requisitions(id)
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER NOT NULL UNIQUE,
    category TEXT NOT NULL,
    PRIMARY KEY (id)
);

CREATE TABLE IF NOT EXISTS budget (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    users_id INTEGER NOT NULL,
    categories_id INTEGER NOT NULL,
    amount TEXT NOT NULL,
    UNIQUE (users_id, categories_id),
    FOREIGN KEY (users_id) REFERENCES users(id),
    FOREIGN KEY (categories_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS balance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL UNIQUE,
    balance TEXT NOT NULL,
    last_checked TEXT NOT NULL,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username ON users(username);
CREATE INDEX IF NOT EXISTS idx_requisitions_users_id ON requisitions(users_id)
"#;
