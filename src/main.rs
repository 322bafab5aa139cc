use budgetlink::budget::BudgetEngine;
use budgetlink::config::{Config, connect_pool};
use budgetlink::crypto::TokenCipher;
use budgetlink::db::Storage;
use budgetlink::provider::ProviderClient;
use budgetlink::requisition::RequisitionEngine;
use budgetlink::token::TokenStore;
use mimalloc::MiMalloc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Bootstrap: load config, initialize the schema, reconcile categories and
/// warm up the provider token. The interactive surface sits outside this
/// crate; everything it needs is ready once this has run.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::from_env()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        api_base = %cfg.api_base,
        loglevel = %cfg.loglevel,
    );

    let pool = connect_pool(&cfg.database_url).await?;
    let storage = Storage::new(pool);
    storage.init_schema().await?;

    let budget = BudgetEngine::new(storage.clone());
    if budget.reconcile_categories().await? {
        info!("category table reseeded from code definition");
    }

    // The installation cipher guards the shared token row; per-user data is
    // guarded by per-user salts at login time.
    let cipher = TokenCipher::derive(cfg.secret_id.as_bytes(), &cfg.secret_key)?;
    let client = ProviderClient::new(cfg.api_base.clone())?;
    let requisitions = RequisitionEngine::new(
        client.clone(),
        storage.clone(),
        cfg.redirect_url.clone(),
    );
    let tokens = TokenStore::new(client, storage, &cfg.secret_id, &cfg.secret_key);

    let token = tokens.ensure_token(&cipher).await?;
    info!(access_expires = %token.access_expires, "provider token ready");
    info!(redirect = %requisitions.redirect(), "requisition engine ready");

    Ok(())
}
