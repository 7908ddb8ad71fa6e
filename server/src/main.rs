//! Spotbook reservation server.
//!
//! Serves the reservation API over the Firebase Realtime Database.
//!
//! # Usage
//!
//! ```bash
//! # Local emulator
//! firebase emulators:start --only database
//!
//! # Run server
//! cargo run --bin spotbook
//! ```
//!
//! Every setting comes from the environment (a `.env` file is read first);
//! see [`config::Config`].

mod config;

use anyhow::Context;
use config::Config;
use metrics_exporter_prometheus::PrometheusBuilder;
use spotbook_core::{ReservationService, SystemClock};
use spotbook_firebase::FirebaseStore;
use spotbook_web::{AppState, build_router, metrics::register_business_metrics};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();
    init_tracing(&config.server.log_level);
    config.validate()?;

    tracing::info!(
        database = %config.firebase.database_url,
        project = %config.firebase.project_id,
        namespace = ?config.firebase.effective_namespace(),
        max_capacity = config.reservations.max_capacity,
        collection = %config.reservations.collection,
        "Configuration loaded"
    );

    let metrics = if config.server.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("failed to install Prometheus recorder")?;
        register_business_metrics();
        Some(handle)
    } else {
        None
    };

    let store = Arc::new(FirebaseStore::new(config.firebase.clone())?);
    let service = ReservationService::new(store, config.reservations.clone(), Arc::new(SystemClock));

    let mut state = AppState::new(service);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    let app = build_router(state);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Spotbook listening");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            // The server only stops on its own when accepting fails.
            result.context("server task panicked")??;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            tracing::info!("Shutdown signal received, draining requests");
        }
    }

    let _ = shutdown_tx.send(());
    match tokio::time::timeout(config.server.shutdown_timeout(), server).await {
        Ok(result) => result.context("server task panicked")??,
        Err(_) => tracing::warn!(
            timeout_secs = config.server.shutdown_timeout,
            "Requests still in flight after shutdown timeout, exiting"
        ),
    }

    tracing::info!("Spotbook stopped");
    Ok(())
}

fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
