use anyhow::Context;
use cache_shell::backend::RedisConnector;
use cache_shell::http::{router, AppState};
use cache_shell::{AppConfig, ConnectionRegistry, KeyValueStore, StoreConfig};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    logger(std::env::var("RUST_LOG").ok().as_deref())
        .try_init()
        .ok();

    let Err(error) = run().await else {
        log::info!("application terminated successfully");
        process::exit(0);
    };

    log::error!("application terminated with error: {:#}", error);
    process::exit(1);
}

/// `info` unless `RUST_LOG` says otherwise.
fn logger(filters: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info);
    if let Some(filters) = filters {
        builder.parse_filters(filters);
    }
    builder
}

async fn run() -> anyhow::Result<()> {
    let app = AppConfig::from_env().context("invalid application configuration")?;
    let store_config = StoreConfig::from_env().context("invalid redis configuration")?;

    log::info!(
        "Starting {} v{} ({})",
        app.app_name,
        cache_shell::VERSION,
        app.exec_env
    );

    let registry = Arc::new(ConnectionRegistry::<RedisConnector>::new(
        store_config.redis_connector(),
        store_config.registry_config(),
    ));
    let store = KeyValueStore::new(Arc::clone(&registry)).with_debug_mode(store_config.debug_mode);

    let state = AppState {
        app_name: app.app_name.clone(),
        store,
    };

    let listener = tokio::net::TcpListener::bind(app.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", app.bind_address()))?;

    log::info!("✓ {} listening on http://{}", app.app_name, app.bind_address());

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error");

    registry.shutdown().await;
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("⚠ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}
