use tokio::signal;
use tracing_subscriber::EnvFilter;

use conflict_map_client::{HttpSource, PlaybackState, TracingRenderer, Viewer, ViewerConfig};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ViewerConfig::from_env();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to build tokio runtime");
            return;
        }
    };

    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run(config));
}

async fn run(config: ViewerConfig) {
    let source = match HttpSource::new(
        &config.api_base,
        config.http_timeout,
        config.http_connect_timeout,
    ) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client");
            return;
        }
    };

    let viewer = Viewer::new(&config, source, TracingRenderer::default());
    tracing::info!(
        api_base = %config.api_base,
        start_year = config.start_year,
        max_year = config.max_year,
        filters = %viewer.filters(),
        "Conflict map viewer starting"
    );

    viewer.initial_load();
    viewer.wait_idle().await;

    let mut playback = viewer.subscribe_playback();
    if viewer.play() {
        tokio::select! {
            _ = playback.wait_for(|state| *state == PlaybackState::Idle) => {}
            () = shutdown_signal() => {
                viewer.stop_playback();
            }
        }
    }

    viewer.wait_idle().await;

    let stats = viewer.coordinator().stats();
    let failures = viewer
        .coordinator()
        .last_outcome()
        .map(|outcome| outcome.failures())
        .unwrap_or_default();
    tracing::info!(
        year = viewer.year(),
        runs = stats.runs_completed,
        superseded = stats.superseded,
        last_run_failures = failures,
        "Viewer finished"
    );
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

    tracing::info!("Shutdown signal received, stopping playback");
}

/// Passes through a delivered signal. A handler that failed to install never
/// fires, so shutdown keeps waiting on the remaining signals.
async fn settle_or_park(result: std::io::Result<()>, handler: &str) {
    if let Err(e) = result {
        tracing::error!(error = %e, "failed to install {handler} handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::settle_or_park;

    #[tokio::test(start_paused = true)]
    async fn failed_handler_install_never_resolves() {
        let parked = tokio::time::timeout(
            Duration::from_secs(60),
            settle_or_park(Err(std::io::Error::other("no signal support")), "SIGTERM"),
        )
        .await;
        assert!(parked.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn delivered_signal_resolves() {
        let settled =
            tokio::time::timeout(Duration::from_secs(1), settle_or_park(Ok(()), "Ctrl+C")).await;
        assert!(settled.is_ok());
    }
}
