//! Outbound email/SMS providers.
//!
//! A provider is anything that can hand a message to an external gateway.
//! [`ChannelProviderRegistry`] picks the active one per channel kind and
//! turns every failure into `false`.

pub mod http;
pub mod log;
pub mod registry;

use async_trait::async_trait;

use notifyhub_core::config::provider::{ProviderKind, ProvidersConfig};
use notifyhub_core::error::AppError;
use notifyhub_core::result::AppResult;

pub use http::{HttpEmailProvider, HttpSmsProvider};
pub use log::{LogEmailProvider, LogSmsProvider};
pub use registry::ChannelProviderRegistry;

/// Sends email.
///
/// `Ok(false)` means the gateway refused the message (for instance on
/// content policy); `Err` means it could not be reached.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> AppResult<bool>;
}

/// Sends SMS.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send(&self, to: &str, message: &str) -> AppResult<bool>;
}

/// Builds a registry with the providers named in configuration.
pub fn registry_from_config(config: &ProvidersConfig) -> AppResult<ChannelProviderRegistry> {
    let registry = ChannelProviderRegistry::new(config.send_timeout())
        .with_preferred_email(config.email.name.clone())
        .with_preferred_sms(config.sms.name.clone());

    match config.email.kind {
        ProviderKind::Disabled => {}
        ProviderKind::Log => registry.register_email_provider(
            &config.email.name,
            LogEmailProvider::new(&config.email.name),
        ),
        ProviderKind::Http => registry.register_email_provider(
            &config.email.name,
            HttpEmailProvider::from_config(&config.email, config.send_timeout())?,
        ),
    }

    match config.sms.kind {
        ProviderKind::Disabled => {}
        ProviderKind::Log => registry
            .register_sms_provider(&config.sms.name, LogSmsProvider::new(&config.sms.name)),
        ProviderKind::Http => registry.register_sms_provider(
            &config.sms.name,
            HttpSmsProvider::from_config(&config.sms, config.send_timeout())?,
        ),
    }

    Ok(registry)
}

pub(crate) fn require_endpoint(name: &str, endpoint: &str) -> AppResult<String> {
    if endpoint.trim().is_empty() {
        return Err(AppError::configuration(format!(
            "Provider '{name}' is of kind http but has no endpoint"
        )));
    }
    Ok(endpoint.trim().to_string())
}
