use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cipherq_events::{LocalBus, MessageBus};
use cipherq_relay::RecordStoreClient;
use cipherq_worker::{ProcessTransform, Supervisor};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cipherq_api::config::ServerConfig;
use cipherq_api::fanout::StatusFanout;
use cipherq_api::router::build_app_router;
use cipherq_api::state::AppState;
use cipherq_api::ws;

/// How long background services get to stop after the pool has drained.
const SERVICE_STOP_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_LOG_FILTER: &str = "cipherq_api=info,cipherq_worker=info,cipherq_relay=info,\
                                  cipherq_events=info,cipherq_core=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = run().await {
        tracing::error!(error = ?e, "Fatal error");
        return Err(e);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        pool_size = config.worker.pool_size,
        record_store = %config.worker.record_store_url,
        "Loaded server configuration",
    );

    tokio::fs::create_dir_all(&config.worker.artifact_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create artifact directory {}",
                config.worker.artifact_dir.display()
            )
        })?;

    // --- Message bus ---
    let bus = Arc::new(LocalBus::new(config.bus_capacity));
    tracing::info!(capacity = config.bus_capacity, "Message bus created");

    // --- Observers ---
    let observers = Arc::new(ws::ObserverRegistry::new());
    let results = bus
        .subscribe(&config.worker.result_topic)
        .await
        .context("Failed to subscribe to result topic")?;
    let fanout_handle = tokio::spawn(StatusFanout::new(Arc::clone(&observers)).run(results));

    let heartbeat_cancel = CancellationToken::new();
    let heartbeat_handle = ws::start_heartbeat(
        Arc::clone(&observers),
        Duration::from_secs(config.heartbeat_interval_secs),
        heartbeat_cancel.clone(),
    );

    // --- Worker pool ---
    let store = RecordStoreClient::new(&config.worker.record_store_url, config.worker.http_timeout)
        .context("Failed to build record store client")?
        .with_retry(config.worker.retry_policy());
    let transform = ProcessTransform::from_config(&config.worker);
    let supervisor = Supervisor::new(
        &config.worker,
        bus.clone(),
        Arc::new(store),
        Arc::new(transform),
    );

    let supervisor_cancel = CancellationToken::new();
    let supervisor_handle = {
        let supervisor = supervisor.clone();
        let cancel = supervisor_cancel.clone();
        tokio::spawn(async move { supervisor.run(cancel).await })
    };

    // --- App state and router ---
    let state = AppState {
        config: Arc::new(config.clone()),
        bus: bus.clone(),
        observers: Arc::clone(&observers),
        supervisor: supervisor.clone(),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let host = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!(%addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop intake and let in-flight jobs finish within the budget.
    supervisor_cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    let mut supervisor_handle = supervisor_handle;
    match tokio::time::timeout(drain, &mut supervisor_handle).await {
        Ok(Ok(Ok(()))) => tracing::info!("Supervisor drained"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Supervisor stopped with error"),
        Ok(Err(e)) => tracing::error!(error = %e, "Supervisor task failed"),
        Err(_) => {
            tracing::warn!(
                in_flight = supervisor.in_flight(),
                "Shutdown budget exceeded, aborting in-flight jobs",
            );
            // Dropping the job futures kills their transform processes.
            supervisor_handle.abort();
        }
    }

    // Closing the bus ends the status fan-out once it has relayed the
    // remaining results.
    bus.close().await;
    let _ = tokio::time::timeout(SERVICE_STOP_TIMEOUT, fanout_handle).await;
    tracing::info!("Status fan-out stopped");

    let remaining = observers.connection_count().await;
    tracing::info!(remaining, "Closing remaining observer connections");
    observers.shutdown_all().await;

    heartbeat_cancel.cancel();
    let _ = tokio::time::timeout(SERVICE_STOP_TIMEOUT, heartbeat_handle).await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix). If a handler cannot
/// be installed the error is logged and that signal is ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
