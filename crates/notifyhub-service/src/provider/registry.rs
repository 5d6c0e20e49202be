//! Channel provider registry.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, warn};

use notifyhub_core::result::AppResult;

use super::{EmailProvider, SmsProvider};

type Named<P> = Vec<(String, Arc<P>)>;

/// Pluggable senders for the non-socket channels.
///
/// Several providers may be registered per kind; sends go to the preferred
/// one when it is registered, otherwise to the first registered. Sends never
/// fail: errors, rejections, panics and timeouts all come back as `false`.
pub struct ChannelProviderRegistry {
    email: RwLock<Named<dyn EmailProvider>>,
    sms: RwLock<Named<dyn SmsProvider>>,
    preferred_email: Option<String>,
    preferred_sms: Option<String>,
    send_timeout: Duration,
}

impl std::fmt::Debug for ChannelProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelProviderRegistry")
            .field("email", &self.email_provider_names())
            .field("sms", &self.sms_provider_names())
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

impl ChannelProviderRegistry {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            email: RwLock::new(Vec::new()),
            sms: RwLock::new(Vec::new()),
            preferred_email: None,
            preferred_sms: None,
            send_timeout,
        }
    }

    pub fn with_preferred_email(mut self, name: impl Into<String>) -> Self {
        self.preferred_email = Some(name.into());
        self
    }

    pub fn with_preferred_sms(mut self, name: impl Into<String>) -> Self {
        self.preferred_sms = Some(name.into());
        self
    }

    /// Registers an email provider. A provider with the same name is replaced.
    pub fn register_email_provider(&self, name: &str, provider: impl EmailProvider + 'static) {
        let mut providers = self.email.write().unwrap_or_else(|e| e.into_inner());
        upsert(&mut providers, name, Arc::new(provider) as Arc<dyn EmailProvider>);
        debug!(provider = %name, "Email provider registered");
    }

    /// Registers an SMS provider. A provider with the same name is replaced.
    pub fn register_sms_provider(&self, name: &str, provider: impl SmsProvider + 'static) {
        let mut providers = self.sms.write().unwrap_or_else(|e| e.into_inner());
        upsert(&mut providers, name, Arc::new(provider) as Arc<dyn SmsProvider>);
        debug!(provider = %name, "SMS provider registered");
    }

    /// Sends an email through the active provider.
    pub async fn send_email(&self, to: &str, subject: &str, html: &str, text: &str) -> bool {
        let active = {
            let providers = self.email.read().unwrap_or_else(|e| e.into_inner());
            select(&providers, self.preferred_email.as_deref())
        };
        let Some((name, provider)) = active else {
            warn!("No email provider registered");
            return false;
        };
        self.guarded("email", &name, provider.send(to, subject, html, text))
            .await
    }

    /// Sends an SMS through the active provider.
    pub async fn send_sms(&self, to: &str, message: &str) -> bool {
        let active = {
            let providers = self.sms.read().unwrap_or_else(|e| e.into_inner());
            select(&providers, self.preferred_sms.as_deref())
        };
        let Some((name, provider)) = active else {
            warn!("No SMS provider registered");
            return false;
        };
        self.guarded("sms", &name, provider.send(to, message)).await
    }

    pub fn email_provider_names(&self) -> Vec<String> {
        let providers = self.email.read().unwrap_or_else(|e| e.into_inner());
        providers.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn sms_provider_names(&self) -> Vec<String> {
        let providers = self.sms.read().unwrap_or_else(|e| e.into_inner());
        providers.iter().map(|(name, _)| name.clone()).collect()
    }

    async fn guarded<F>(&self, channel: &str, name: &str, call: F) -> bool
    where
        F: Future<Output = AppResult<bool>>,
    {
        let call = AssertUnwindSafe(call).catch_unwind();
        match tokio::time::timeout(self.send_timeout, call).await {
            Ok(Ok(Ok(true))) => true,
            Ok(Ok(Ok(false))) => {
                warn!(channel, provider = %name, "Provider rejected message");
                false
            }
            Ok(Ok(Err(e))) => {
                warn!(channel, provider = %name, error = %e, "Provider send failed");
                false
            }
            Ok(Err(_)) => {
                error!(channel, provider = %name, "Provider panicked during send");
                false
            }
            Err(_) => {
                warn!(
                    channel,
                    provider = %name,
                    timeout_ms = self.send_timeout.as_millis() as u64,
                    "Provider send timed out"
                );
                false
            }
        }
    }
}

fn upsert<P: ?Sized>(providers: &mut Named<P>, name: &str, provider: Arc<P>) {
    match providers.iter_mut().find(|(existing, _)| existing == name) {
        Some(slot) => slot.1 = provider,
        None => providers.push((name.to_string(), provider)),
    }
}

fn select<P: ?Sized>(providers: &Named<P>, preferred: Option<&str>) -> Option<(String, Arc<P>)> {
    preferred
        .and_then(|wanted| providers.iter().find(|(name, _)| name == wanted))
        .or_else(|| providers.first())
        .map(|(name, provider)| (name.clone(), provider.clone()))
}
