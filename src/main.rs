use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use todo_api::auth::TokenService;
use todo_api::config::AppConfig;
use todo_api::store::PgStore;
use todo_api::{db, rocket_instance, AppState};

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "starting todo api");

    let pool = db::init_pool(&config.database_url, config.db_pool_size)
        .context("failed to create database pool")?;
    let applied = db::run_migrations(&pool)?;
    tracing::info!(applied, "database ready");

    let tokens = TokenService::new(&config.jwt_secret, config.token_ttl);
    let state = AppState::with_store(Arc::new(PgStore::new(pool)), tokens, config.bcrypt_cost);

    let figment = rocket::Config::figment().merge(("port", config.port));
    rocket_instance(state, &config.api_version)
        .configure(figment)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("server failed: {}", e))?;

    Ok(())
}
