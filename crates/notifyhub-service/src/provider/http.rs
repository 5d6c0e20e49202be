//! Providers that post to a JSON HTTP gateway.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use notifyhub_core::config::provider::ProviderConfig;
use notifyhub_core::error::AppError;
use notifyhub_core::result::AppResult;

use super::{EmailProvider, SmsProvider, require_endpoint};

#[derive(Debug, Clone)]
struct Gateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    sender: String,
}

impl Gateway {
    fn from_config(config: &ProviderConfig, timeout: Duration) -> AppResult<Self> {
        let endpoint = require_endpoint(&config.name, &config.endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::configuration(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            sender: config.sender.clone(),
        })
    }

    /// Returns `Ok(false)` on a non-success status.
    async fn post<T: Serialize + ?Sized>(&self, body: &T) -> AppResult<bool> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| AppError::external(format!("Gateway {}: {e}", self.endpoint)))?;
        let status = response.status();
        debug!(endpoint = %self.endpoint, status = status.as_u16(), "Gateway responded");
        Ok(status.is_success())
    }
}

#[derive(Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct SmsPayload<'a> {
    from: &'a str,
    to: &'a str,
    body: &'a str,
}

/// Email over an HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpEmailProvider {
    gateway: Gateway,
}

impl HttpEmailProvider {
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            gateway: Gateway::from_config(config, timeout)?,
        })
    }
}

#[async_trait]
impl EmailProvider for HttpEmailProvider {
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> AppResult<bool> {
        self.gateway
            .post(&EmailPayload {
                from: &self.gateway.sender,
                to,
                subject,
                html,
                text,
            })
            .await
    }
}

/// SMS over an HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpSmsProvider {
    gateway: Gateway,
}

impl HttpSmsProvider {
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            gateway: Gateway::from_config(config, timeout)?,
        })
    }
}

#[async_trait]
impl SmsProvider for HttpSmsProvider {
    async fn send(&self, to: &str, message: &str) -> AppResult<bool> {
        self.gateway
            .post(&SmsPayload {
                from: &self.gateway.sender,
                to,
                body: message,
            })
            .await
    }
}
