//! API server entry point.

use api::{Config, Resources};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Resolves on SIGINT or SIGTERM, telling the reconciliation workers to
/// stop while the HTTP server drains in-flight requests.
async fn shutdown_signal(stop_workers: watch::Sender<bool>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        () = ctrl_c => "SIGINT",
        () = terminate => "SIGTERM",
    };
    tracing::info!(signal = received, "starting graceful shutdown");
    let _ = stop_workers.send(true);
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Connect store, cache and bus
    let resources = Resources::connect(&config)
        .await
        .expect("failed to connect resources");

    // 4. Build services and start reconciliation workers
    let (state, reconciler) = api::create_services(&resources, config.reconciler_policy);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = reconciler.spawn_workers(config.reconciler_workers, shutdown_rx);
    tracing::info!(
        workers = config.reconciler_workers,
        policy = ?config.reconciler_policy,
        "stock reconciliation running"
    );

    // 5. Start server
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .expect("server error");

    // 6. Drain workers, then release connections
    for result in futures_util::future::join_all(workers).await {
        if let Err(e) = result {
            tracing::error!(error = %e, "reconciliation worker panicked");
        }
    }
    resources.shutdown().await;

    tracing::info!("server shut down gracefully");
}
