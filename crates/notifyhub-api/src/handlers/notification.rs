//! Notification history, read receipts and channel preferences.

use axum::Json;
use axum::extract::{Path, Query, State};

use notifyhub_core::types::NotificationId;
use notifyhub_entity::channel::ChannelPreference;
use notifyhub_entity::notification::Notification;
use notifyhub_service::PreferenceUpdate;
use notifyhub_store::NotificationPage;

use crate::dto::request::HistoryQuery;
use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<ApiResponse<NotificationPage>>> {
    let filter = query.into_filter()?;
    let page = state
        .notifications
        .get_user_notifications(&auth, &filter)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<NotificationId>,
) -> ApiResult<Json<ApiResponse<Notification>>> {
    let notification = state.notifications.mark_as_read(id, &auth).await?;
    Ok(Json(ApiResponse::ok(notification)))
}

/// GET /api/notifications/preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<ChannelPreference>>>> {
    let preferences = state.notifications.get_channel_preferences(&auth).await?;
    Ok(Json(ApiResponse::ok(preferences)))
}

/// PUT /api/notifications/preferences/{channel}
pub async fn update_preference(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel): Path<String>,
    Json(body): Json<PreferenceUpdate>,
) -> ApiResult<Json<ApiResponse<ChannelPreference>>> {
    let preference = state
        .notifications
        .update_channel_preferences(&auth, &channel, body.enabled, body.configuration)
        .await?;
    Ok(Json(ApiResponse::ok(preference)))
}
