//! Providers that only log what they would send.

use async_trait::async_trait;
use tracing::info;

use notifyhub_core::result::AppResult;

use super::{EmailProvider, SmsProvider};

/// Logs each email and reports it as sent.
#[derive(Debug, Clone)]
pub struct LogEmailProvider {
    name: String,
}

impl LogEmailProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl EmailProvider for LogEmailProvider {
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> AppResult<bool> {
        info!(
            provider = %self.name,
            to,
            subject,
            text,
            html_bytes = html.len(),
            "Email sent"
        );
        Ok(true)
    }
}

/// Logs each SMS and reports it as sent.
#[derive(Debug, Clone)]
pub struct LogSmsProvider {
    name: String,
}

impl LogSmsProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl SmsProvider for LogSmsProvider {
    async fn send(&self, to: &str, message: &str) -> AppResult<bool> {
        info!(provider = %self.name, to, message, "SMS sent");
        Ok(true)
    }
}
