//! Library lending ledger server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use library_ledger::{
    api,
    clock::SystemClock,
    config::{AppConfig, LoggingConfig},
    repository::{CredentialStore, LedgerStore, MemoryStore, PgStore},
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    init_tracing(&config.logging);

    tracing::info!("Starting library ledger v{}", env!("CARGO_PKG_VERSION"));

    let (store, credentials): (Arc<dyn LedgerStore>, Arc<dyn CredentialStore>) =
        if config.uses_memory_store() {
            tracing::warn!("Using the in-memory store; nothing will be persisted");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn LedgerStore>, store as Arc<dyn CredentialStore>)
        } else {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
                .connect(&config.database.url)
                .await?;

            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations").run(&pool).await?;

            tracing::info!("Database migrations completed");

            let store = Arc::new(PgStore::new(pool));
            (store.clone() as Arc<dyn LedgerStore>, store as Arc<dyn CredentialStore>)
        };

    let services = Services::new(
        store,
        credentials,
        Arc::new(SystemClock),
        &config.lending,
        &config.auth,
    );

    spawn_session_purge(
        services.clone(),
        Duration::from_secs(config.auth.purge_interval_seconds),
    );

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("library_ledger={},tower_http=debug", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Periodically drop expired sessions so the table does not grow unbounded
fn spawn_session_purge(services: Services, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let purged = services.auth.purge_expired_sessions();
            if purged > 0 {
                tracing::debug!(purged, "Expired sessions purged");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
