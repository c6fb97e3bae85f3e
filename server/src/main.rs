mod app;
mod config;
mod routes;
mod services;
mod state;
mod store;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;
use crate::store::{DatasetStore, YearIndex};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let events_path = config::conflicts_geojson_path();
    let regions_path = config::conflict_countries_geojson_path();
    tracing::info!(
        events = %events_path.display(),
        regions = %regions_path.display(),
        "Loading datasets..."
    );
    let store = DatasetStore::load(&events_path, &regions_path).await;
    if store.events.is_none() && store.regions.is_none() {
        tracing::warn!("no dataset loaded; every data endpoint will answer 503");
    }
    for (label, index) in [("events", &store.events), ("regions", &store.regions)] {
        if index.as_ref().is_some_and(YearIndex::is_empty) {
            tracing::warn!(dataset = label, "dataset file holds no usable features");
        }
    }

    let state = AppState::new(store);
    tracing::info!(
        cache_enabled = state.response_cache.is_some(),
        cache_ttl_secs = state.cache_ttl_secs,
        max_size = state.max_size,
        "Response settings"
    );

    // Spawn background services
    tokio::spawn(services::cache_evictor::run(state.clone()));

    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!("Conflict map API listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        settle_or_park(signal::ctrl_c().await, "Ctrl+C").await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => settle_or_park(Err(e), "SIGTERM").await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Passes through a delivered signal. A handler that failed to install never
/// fires, so shutdown keeps waiting on the remaining signals.
async fn settle_or_park(result: std::io::Result<()>, handler: &str) {
    if let Err(e) = result {
        tracing::error!(error = %e, "failed to install {handler} handler");
        std::future::pending::<()>().await;
    }
}
