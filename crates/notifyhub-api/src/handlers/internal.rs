//! Service-to-service routes used by upstream business services.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use notifyhub_core::types::UserId;
use notifyhub_entity::notification::Notification;
use notifyhub_realtime::PushPayload;
use notifyhub_service::{NewNotification, ServiceStats};

use crate::dto::response::{ApiResponse, FanOutResponse};
use crate::error::ApiResult;
use crate::extractors::InternalCaller;
use crate::state::AppState;

/// POST /internal/notifications
pub async fn create_notification(
    State(state): State<AppState>,
    _caller: InternalCaller,
    Json(request): Json<NewNotification>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Notification>>)> {
    let notification = state.notifications.create_notification(request).await?;
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::ok(notification))))
}

/// POST /internal/realtime/{user_id}
pub async fn send_realtime(
    State(state): State<AppState>,
    _caller: InternalCaller,
    Path(user_id): Path<String>,
    Json(payload): Json<PushPayload>,
) -> ApiResult<Json<ApiResponse<FanOutResponse>>> {
    let delivered_to = state
        .notifications
        .send_realtime(&UserId::new(user_id), payload);
    Ok(Json(ApiResponse::ok(FanOutResponse { delivered_to })))
}

/// POST /internal/broadcast/{topic}
pub async fn broadcast(
    State(state): State<AppState>,
    _caller: InternalCaller,
    Path(topic): Path<String>,
    Json(payload): Json<PushPayload>,
) -> ApiResult<Json<ApiResponse<FanOutResponse>>> {
    let delivered_to = state.notifications.broadcast_to_topic(&topic, payload)?;
    Ok(Json(ApiResponse::ok(FanOutResponse { delivered_to })))
}

/// GET /internal/stats
pub async fn stats(
    State(state): State<AppState>,
    _caller: InternalCaller,
) -> ApiResult<Json<ApiResponse<ServiceStats>>> {
    Ok(Json(ApiResponse::ok(state.notifications.stats().await?)))
}
