//! # notifyhub-api
//!
//! HTTP API layer for NotifyHub built on Axum.
//!
//! Provides the user and internal REST endpoints, the WebSocket upgrade,
//! middleware (CORS, request logging), extractors, DTOs and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, build_service, run_server};
pub use state::AppState;
