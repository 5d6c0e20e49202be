//! Integration tests for the notification HTTP surface and delivery worker.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use notifyhub_core::types::UserId;
use notifyhub_worker::Processed;

use helpers::TestApp;

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/health", None, &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["activeConnections"], 0);
}

#[tokio::test]
async fn test_internal_routes_reject_wrong_key() {
    let app = TestApp::new();

    let response = app
        .request("GET", "/internal/stats", None, &[("x-api-key", "nope")])
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_internal_routes_disabled_without_key() {
    let app = TestApp::with_config(|c| c.auth.internal_api_key.clear());

    let response = app
        .request("GET", "/internal/stats", None, &[("x-api-key", "")])
        .await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_offline_user_is_retried_later() {
    let app = TestApp::new();

    let created = app
        .internal_request(
            "POST",
            "/internal/notifications",
            Some(json!({
                "userId": "aff-9",
                "type": "balance_update",
                "title": "Balance",
                "message": "Your balance changed"
            })),
        )
        .await;
    assert_eq!(created.status, StatusCode::ACCEPTED);
    assert_eq!(created.body["data"]["channels"], json!(["websocket", "in_app"]));

    let processed = app.worker().process_next().await.unwrap();
    let Processed::Attempted(report) = processed else {
        panic!("Expected an attempt, got {processed:?}");
    };
    assert!(report.next_attempt_at.is_some());

    let history = app
        .user_request("GET", "/api/notifications", "aff-9", None)
        .await;
    assert_eq!(history.status, StatusCode::OK);
    let item = &history.body["data"]["items"][0];
    assert_eq!(item["status"], "pending");
    assert_eq!(item["retryCount"], 1);

    // Retry is not due yet.
    assert!(matches!(
        app.worker().process_next().await.unwrap(),
        Processed::Idle
    ));
}

#[tokio::test]
async fn test_connected_user_sees_delivered_history_and_marks_read() {
    let app = TestApp::new();
    let (_handle, _rx) = app.state.connections().register(UserId::new("aff-1"));

    let created = app
        .internal_request(
            "POST",
            "/internal/notifications",
            Some(json!({
                "userId": "aff-1",
                "type": "offer_approved",
                "title": "Offer approved",
                "message": "You can now promote offer 77",
                "priority": "high"
            })),
        )
        .await;
    let id = created.body["data"]["id"].as_str().unwrap().to_string();

    assert!(matches!(
        app.worker().process_next().await.unwrap(),
        Processed::Attempted(_)
    ));

    let history = app
        .user_request("GET", "/api/notifications?unreadOnly=true", "aff-1", None)
        .await;
    assert_eq!(history.body["data"]["total"], 1);
    assert_eq!(history.body["data"]["items"][0]["status"], "delivered");

    let read = app
        .user_request("PUT", &format!("/api/notifications/{id}/read"), "aff-1", None)
        .await;
    assert_eq!(read.status, StatusCode::OK);
    assert!(read.body["data"]["readAt"].is_string());

    let history = app
        .user_request("GET", "/api/notifications?unreadOnly=true", "aff-1", None)
        .await;
    assert_eq!(history.body["data"]["total"], 0);
    assert_eq!(history.body["data"]["unreadCount"], 0);
}

#[tokio::test]
async fn test_mark_read_unknown_notification() {
    let app = TestApp::new();
    let id = notifyhub_core::types::NotificationId::new();

    let response = app
        .user_request("PUT", &format!("/api/notifications/{id}/read"), "aff-1", None)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_email_preference_requires_address() {
    let app = TestApp::new();

    let response = app
        .user_request(
            "PUT",
            "/api/notifications/preferences/email",
            "aff-1",
            Some(json!({"enabled": true})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .user_request(
            "PUT",
            "/api/notifications/preferences/pigeon",
            "aff-1",
            Some(json!({"enabled": true})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_reflect_queue_and_connections() {
    let app = TestApp::new();
    let (_handle, _rx) = app.state.connections().register(UserId::new("aff-1"));

    app.internal_request(
        "POST",
        "/internal/notifications",
        Some(json!({"userId": "aff-2", "type": "promotional", "title": "Sale", "message": "Bonus week"})),
    )
    .await;

    let stats = app.internal_request("GET", "/internal/stats", None).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["data"]["activeConnections"], 1);
    assert_eq!(stats.body["data"]["connectedUsers"], 1);
    assert_eq!(stats.body["data"]["pendingDeliveries"], 1);
}
