use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

/// Crate-wide error taxonomy.
///
/// The token and requisition variants are part of the caller contract:
/// `NoSavedToken` means "mint a fresh token", `ExpiredToken` means "the
/// session is unrecoverable, re-authenticate from scratch". Neither is ever
/// swallowed internally.
#[derive(Debug, ThisError)]
pub enum BudgetError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("no saved token; request a new one")]
    NoSavedToken,

    #[error("refresh token expired; full re-authentication required")]
    ExpiredToken,

    #[error("provider rejected the requisition call")]
    InvalidRequisition,

    #[error("provider error (status {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("malformed provider payload: {0}")]
    Normalization(String),

    #[error("user {0} is already registered")]
    AlreadyRegistered(String),

    #[error("wrong username or password")]
    Authentication,

    #[error("crypto error: {0}")]
    Crypto(String),
}

impl BudgetError {
    /// True only for the failure `load_token` callers may recover from by
    /// minting a brand-new token.
    pub fn is_recoverable_token_miss(&self) -> bool {
        matches!(self, BudgetError::NoSavedToken)
    }
}
