use chrono::{DateTime, Utc};

/// A row in `users`. `password` is the argon2 hash string, never plaintext.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: i64,
    pub user_id: Vec<u8>,
    pub username: String,
    pub password: String,
    pub salt: Vec<u8>,
}

/// The single persisted token row. `access`/`refresh` are AES-GCM blobs.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRow {
    pub access: Vec<u8>,
    pub access_expires: DateTime<Utc>,
    pub refresh: Vec<u8>,
    pub refresh_expires: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequisitionRow {
    pub id: i64,
    pub requisition_id: String,
    pub expiry: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub id: i64,
    pub account_id: String,
    pub requisition_id: i64,
}
