use figment::{Figment, providers::Env};
use serde::Deserialize;
use url::Url;

use crate::error::BudgetError;

fn default_api_base() -> Url {
    Url::parse("https://ob.nordigen.com/api/v2/").expect("default API base is a valid URL")
}

fn default_redirect_url() -> Url {
    Url::parse("http://localhost:8501/").expect("default redirect URL is valid")
}

fn default_database_url() -> String {
    "sqlite:.db/budgetlink.db".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}

/// Runtime configuration, read once at startup from `BUDGETLINK_`-prefixed
/// environment variables (plus `.env` via dotenvy in the binary).
///
/// There is deliberately no global `CONFIG` static: every piece of state is
/// handed to the components that need it.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Provider secret id. Never persisted; used only to mint tokens.
    pub secret_id: String,
    /// Provider secret key. Doubles as the cipher password for tokens at rest.
    pub secret_key: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_api_base")]
    pub api_base: Url,
    /// Where the provider sends the user back after granting consent.
    #[serde(default = "default_redirect_url")]
    pub redirect_url: Url,
    #[serde(default = "default_loglevel")]
    pub loglevel: String,
}

impl Config {
    pub fn from_env() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Env::prefixed("BUDGETLINK_"))
            .extract()
    }
}

/// Open the SQLite pool for `database_url`, creating the file if missing.
pub async fn connect_pool(database_url: &str) -> Result<sqlx::SqlitePool, BudgetError> {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    let opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(opts).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    // One combined test: env vars are process-wide, so separate Jail tests
    // over the same prefix would race under the parallel runner.
    #[test]
    fn env_overrides_and_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BUDGETLINK_SECRET_ID", "sid");
            jail.set_env("BUDGETLINK_SECRET_KEY", "skey");
            jail.set_env("BUDGETLINK_REDIRECT_URL", "http://localhost:9999/callback");
            let cfg = Config::from_env()?;
            assert_eq!(cfg.secret_id, "sid");
            assert_eq!(cfg.database_url, "sqlite:.db/budgetlink.db");
            assert_eq!(cfg.api_base.as_str(), "https://ob.nordigen.com/api/v2/");
            assert_eq!(cfg.redirect_url.as_str(), "http://localhost:9999/callback");
            Ok(())
        });
    }
}
