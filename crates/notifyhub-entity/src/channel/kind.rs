//! Channel kind enumeration.

use std::fmt;
use std::str::FromStr;

use notifyhub_core::AppError;
use serde::{Deserialize, Serialize};

/// A mechanism through which a notification can reach a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Push over a live real-time connection.
    Websocket,
    /// In-app notification center, also fed through live connections.
    InApp,
    Email,
    Sms,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 4] = [Self::Websocket, Self::InApp, Self::Email, Self::Sms];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Websocket => "websocket",
            Self::InApp => "in_app",
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }

    /// Delivered through the connection registry rather than a provider.
    pub fn is_realtime(&self) -> bool {
        matches!(self, Self::Websocket | Self::InApp)
    }

    /// Preference assumed when the user never configured the channel.
    ///
    /// Provider channels need an address, so they stay off until set up.
    pub fn enabled_by_default(&self) -> bool {
        self.is_realtime()
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Unknown channel '{s}', expected one of: websocket, in_app, email, sms"
                ))
            })
    }
}
