//! Route definitions for the NotifyHub HTTP API.
//!
//! User-facing routes live under `/api`, service-to-service routes under
//! `/internal`, and the socket endpoint at `/ws`.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the Axum router and thread `AppState` through every route.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(notification_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .nest("/internal", internal_routes())
        .route("/ws", get(handlers::ws::ws_upgrade))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// History, read receipts and preferences for the calling user
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(handlers::notification::list_notifications),
        )
        .route(
            "/notifications/{id}/read",
            put(handlers::notification::mark_read),
        )
        .route(
            "/notifications/preferences",
            get(handlers::notification::get_preferences),
        )
        .route(
            "/notifications/preferences/{channel}",
            put(handlers::notification::update_preference),
        )
}

/// Command surface for upstream services, guarded by the internal API key
fn internal_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            post(handlers::internal::create_notification),
        )
        .route(
            "/realtime/{user_id}",
            post(handlers::internal::send_realtime),
        )
        .route("/broadcast/{topic}", post(handlers::internal::broadcast))
        .route("/stats", get(handlers::internal::stats))
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
