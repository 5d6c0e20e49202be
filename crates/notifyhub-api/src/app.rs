//! Application builder: wires router, middleware and background tasks.

use std::sync::Arc;

use axum::Router;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use notifyhub_core::config::AppConfig;
use notifyhub_core::config::app::CorsConfig;
use notifyhub_core::error::AppError;
use notifyhub_core::events::EventBus;
use notifyhub_realtime::ConnectionRegistry;
use notifyhub_realtime::connection::close_code;
use notifyhub_realtime::connection::sweeper::run_idle_sweeper;
use notifyhub_service::provider::registry_from_config;
use notifyhub_service::{NotificationService, TemplateStore};
use notifyhub_store::{MemoryDeliveryQueue, MemoryNotificationStore};
use notifyhub_worker::DeliveryWorker;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState, cors_config: &CorsConfig) -> Router {
    build_router(state)
        .layer(build_cors_layer(cors_config))
        .layer(TraceLayer::new_for_http())
}

/// Assembles the notification service from configuration.
pub fn build_service(config: &AppConfig) -> Result<NotificationService, AppError> {
    let providers = registry_from_config(&config.providers)?;
    tracing::info!(
        email = ?providers.email_provider_names(),
        sms = ?providers.sms_provider_names(),
        "Channel providers registered"
    );

    Ok(NotificationService::new(
        Arc::new(MemoryNotificationStore::new()),
        Arc::new(MemoryDeliveryQueue::new()),
        Arc::new(ConnectionRegistry::new(config.realtime.clone())),
        Arc::new(providers),
        Arc::new(TemplateStore::with_defaults()),
        EventBus::default(),
        config.delivery.clone(),
    ))
}

/// Runs the NotifyHub server until Ctrl+C.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting NotifyHub server...");

    let notifications = Arc::new(build_service(&config)?);
    let connections = notifications.connections().clone();

    // ── Background tasks ─────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    if config.delivery.enabled {
        let worker = DeliveryWorker::new(&notifications);
        let cancel = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            worker.run(cancel).await;
        }));
    } else {
        tracing::warn!("Delivery worker disabled; notifications will stay pending");
    }

    tasks.push(tokio::spawn(run_idle_sweeper(
        connections.clone(),
        config.realtime.sweep_interval(),
        config.realtime.idle_timeout(),
        shutdown_rx.clone(),
    )));

    // ── HTTP server ──────────────────────────────────────────────
    let state = AppState::new(Arc::new(config.clone()), notifications);
    let app = build_app(state, &config.server.cors);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("NotifyHub server listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // ── Shutdown ─────────────────────────────────────────────────
    let _ = shutdown_tx.send(true);
    let closed = connections.close_all(close_code::GOING_AWAY, "Server shutting down");
    tracing::info!(closed, "Closed realtime connections");

    let grace = config.server.shutdown_grace();
    for task in tasks {
        if tokio::time::timeout(grace, task).await.is_err() {
            tracing::warn!("Background task did not stop within the grace period");
        }
    }

    served.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
    tracing::info!("NotifyHub server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
