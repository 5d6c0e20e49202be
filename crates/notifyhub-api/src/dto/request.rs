//! Request DTOs.

use serde::{Deserialize, Serialize};

use notifyhub_core::result::AppResult;
use notifyhub_core::types::Pagination;
use notifyhub_entity::notification::{NotificationType, Priority};
use notifyhub_store::NotificationFilter;

/// Query string of `GET /api/notifications`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    #[serde(default)]
    pub unread_only: bool,
    /// Comma-separated notification types.
    pub types: Option<String>,
    pub priority: Option<String>,
}

impl HistoryQuery {
    pub fn into_filter(self) -> AppResult<NotificationFilter> {
        let types = self
            .types
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::parse::<NotificationType>)
            .collect::<AppResult<Vec<_>>>()?;

        let priority = self
            .priority
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::parse::<Priority>)
            .transpose()?;

        Ok(NotificationFilter {
            page: Pagination::from_parts(self.limit, self.offset),
            unread_only: self.unread_only,
            types,
            priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_filter() {
        let filter = HistoryQuery {
            limit: Some(500),
            offset: Some(10),
            unread_only: true,
            types: Some("payout_processed, fraud_alert,".into()),
            priority: Some("high".into()),
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.page.limit, 200);
        assert_eq!(filter.page.offset, 10);
        assert!(filter.unread_only);
        assert_eq!(
            filter.types,
            vec![NotificationType::PayoutProcessed, NotificationType::FraudAlert]
        );
        assert_eq!(filter.priority, Some(Priority::High));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let query = HistoryQuery {
            types: Some("payout_processed,nope".into()),
            ..HistoryQuery::default()
        };
        assert!(query.into_filter().is_err());
    }
}
