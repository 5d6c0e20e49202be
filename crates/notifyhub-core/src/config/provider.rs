//! Outbound email/SMS provider configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which implementation backs a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// No provider registered; every send on the channel fails.
    Disabled,
    /// Writes the message to the log and reports success.
    #[default]
    Log,
    /// Posts a JSON payload to an HTTP gateway.
    Http,
}

/// Settings for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    /// Registry name of the provider.
    #[serde(default = "default_name")]
    pub name: String,
    /// Gateway URL for the `http` kind.
    #[serde(default)]
    pub endpoint: String,
    /// Bearer token sent to the gateway.
    #[serde(default)]
    pub api_key: String,
    /// Sender address or number.
    #[serde(default)]
    pub sender: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            name: default_name(),
            endpoint: String::new(),
            api_key: String::new(),
            sender: String::new(),
        }
    }
}

/// Provider settings per channel kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub email: ProviderConfig,
    #[serde(default)]
    pub sms: ProviderConfig,
    /// Upper bound on a single provider call.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            email: ProviderConfig::default(),
            sms: ProviderConfig::default(),
            send_timeout_seconds: default_send_timeout(),
        }
    }
}

impl ProvidersConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_seconds)
    }
}

fn default_name() -> String {
    "default".to_string()
}

fn default_send_timeout() -> u64 {
    10
}
