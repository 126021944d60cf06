//! GitFreelas lifecycle service binary.
//!
//! Wires the configured adapters into the webhook service and serves the
//! HTTP routes. Requires a reachable `PostgreSQL` instance and valid
//! GitHub credentials; see `gitfreelas.toml` and the `GITFREELAS_`
//! environment variables.

use diesel::r2d2::{ConnectionManager, Pool};
use gitfreelas::config::AppConfig;
use gitfreelas::server::{AppState, router};
use gitfreelas::task::adapters::github::{GithubClientConfig, GithubForge};
use gitfreelas::task::adapters::postgres::PostgresTaskStore;
use gitfreelas::webhook::{WebhookSecret, WebhookService};
use mockable::DefaultClock;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load()?;

    let manager = ConnectionManager::new(&config.database.url);
    let pool = Pool::builder().build(manager)?;
    let store = Arc::new(PostgresTaskStore::new(pool));

    let mut github = GithubClientConfig::new(&config.github.token, &config.github.owner);
    github.api_url = config.github.api_url.clone();
    let forge = Arc::new(GithubForge::new(github)?);

    let clock = Arc::new(DefaultClock);
    let webhook = WebhookService::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        WebhookSecret::new(&config.webhook.secret),
    );

    let state = Arc::new(AppState { webhook, forge });
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    info!(addr = %config.server.bind_addr, "gitfreelas lifecycle service listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
