//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a default so that an empty file is a
//! valid configuration.

pub mod app;
pub mod auth;
pub mod delivery;
pub mod logging;
pub mod provider;
pub mod realtime;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::auth::AuthConfig;
use self::delivery::DeliveryConfig;
use self::logging::LoggingConfig;
use self::provider::ProvidersConfig;
use self::realtime::RealtimeConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Real-time WebSocket settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Delivery queue and worker settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Email/SMS provider settings.
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `NOTIFYHUB__`
    /// (e.g. `NOTIFYHUB__REALTIME__IDLE_TIMEOUT_SECONDS=600`).
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("NOTIFYHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::delivery::RetryStrategy;
    use crate::config::provider::ProviderKind;

    #[test]
    fn test_defaults_match_reference_limits() {
        let config = AppConfig::default();
        assert_eq!(config.realtime.max_connections_per_user, 5);
        assert_eq!(config.realtime.idle_timeout_seconds, 1800);
        assert_eq!(config.realtime.sweep_interval_seconds, 300);
        assert_eq!(config.delivery.poll_interval_ms, 5000);
        assert_eq!(config.delivery.pacing_ms, 100);
        assert_eq!(config.delivery.default_max_retries, 3);
        assert_eq!(config.delivery.expiry_hours, 24);
        assert_eq!(config.delivery.retry.strategy, RetryStrategy::Fixed);
        assert_eq!(config.delivery.retry.delay_seconds, 300);
        assert_eq!(config.providers.email.kind, ProviderKind::Log);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let source = r#"
            [realtime]
            max_connections_per_user = 2

            [delivery.retry]
            strategy = "exponential"
            jitter = true

            [providers.email]
            kind = "http"
            endpoint = "https://mail.example.com/send"
        "#;
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap();

        assert_eq!(config.realtime.max_connections_per_user, 2);
        assert_eq!(config.realtime.channel_buffer_size, 256);
        assert_eq!(config.delivery.retry.strategy, RetryStrategy::Exponential);
        assert!(config.delivery.retry.jitter);
        assert_eq!(config.delivery.retry.delay_seconds, 300);
        assert_eq!(config.providers.email.kind, ProviderKind::Http);
        assert_eq!(config.providers.sms.kind, ProviderKind::Log);
        assert_eq!(config.server.port, 8080);
    }
}
