//! Application state shared across all handlers.

use std::sync::Arc;

use notifyhub_core::config::AppConfig;
use notifyhub_realtime::{ConnectionRegistry, HandshakeAuthenticator};
use notifyhub_service::NotificationService;

/// Passed to every Axum handler via `State<AppState>`.
///
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub notifications: Arc<NotificationService>,
    /// Verifies socket handshakes and bearer tokens.
    pub authenticator: Arc<HandshakeAuthenticator>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, notifications: Arc<NotificationService>) -> Self {
        let authenticator = Arc::new(HandshakeAuthenticator::new(&config.auth));
        Self {
            config,
            notifications,
            authenticator,
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        self.notifications.connections()
    }
}
