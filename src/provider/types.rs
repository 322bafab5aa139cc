use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Response of `POST /token/new/`. Expiries are relative seconds; the token
/// store converts them to absolute timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access: String,
    pub access_expires: i64,
    pub refresh: String,
    pub refresh_expires: i64,
}

/// Response of `POST /token/refresh/`. Only the access half is renewed.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    pub access_expires: i64,
}

/// A financial institution available for linking in a given country.
#[derive(Debug, Clone, Deserialize)]
pub struct Institution {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bic: Option<String>,
    #[serde(default)]
    pub countries: Vec<String>,
}

/// Response of `POST /requisitions/` and `GET /requisitions/{id}/`.
///
/// `accounts` stays empty until the user completes consent out-of-band.
#[derive(Debug, Clone, Deserialize)]
pub struct RequisitionResponse {
    pub id: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub accounts: Vec<String>,
}
