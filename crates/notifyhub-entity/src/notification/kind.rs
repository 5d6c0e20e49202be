//! Business event kinds a notification can describe.

use std::fmt;
use std::str::FromStr;

use notifyhub_core::AppError;
use serde::{Deserialize, Serialize};

/// Kind of business event behind a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    SecurityAlert,
    LoginNotification,
    PayoutProcessed,
    PayoutFailed,
    ConversionApproved,
    ConversionRejected,
    OfferApproved,
    OfferRejected,
    KycStatusUpdate,
    AccountUpdate,
    SystemMaintenance,
    Promotional,
    FraudAlert,
    BalanceUpdate,
    NewOfferAvailable,
    PerformanceMilestone,
}

impl NotificationType {
    /// Every known kind, in declaration order.
    pub const ALL: [NotificationType; 16] = [
        Self::SecurityAlert,
        Self::LoginNotification,
        Self::PayoutProcessed,
        Self::PayoutFailed,
        Self::ConversionApproved,
        Self::ConversionRejected,
        Self::OfferApproved,
        Self::OfferRejected,
        Self::KycStatusUpdate,
        Self::AccountUpdate,
        Self::SystemMaintenance,
        Self::Promotional,
        Self::FraudAlert,
        Self::BalanceUpdate,
        Self::NewOfferAvailable,
        Self::PerformanceMilestone,
    ];

    /// Return the kind as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityAlert => "security_alert",
            Self::LoginNotification => "login_notification",
            Self::PayoutProcessed => "payout_processed",
            Self::PayoutFailed => "payout_failed",
            Self::ConversionApproved => "conversion_approved",
            Self::ConversionRejected => "conversion_rejected",
            Self::OfferApproved => "offer_approved",
            Self::OfferRejected => "offer_rejected",
            Self::KycStatusUpdate => "kyc_status_update",
            Self::AccountUpdate => "account_update",
            Self::SystemMaintenance => "system_maintenance",
            Self::Promotional => "promotional",
            Self::FraudAlert => "fraud_alert",
            Self::BalanceUpdate => "balance_update",
            Self::NewOfferAvailable => "new_offer_available",
            Self::PerformanceMilestone => "performance_milestone",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Unknown notification type '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_roundtrip() {
        for kind in NotificationType::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<NotificationType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_type_is_validation_error() {
        let err = "payday".parse::<NotificationType>().unwrap_err();
        assert_eq!(err.kind, notifyhub_core::error::ErrorKind::Validation);
    }
}
