//! Integration tests for WebSocket connection and messaging.

mod helpers;

use futures::SinkExt;
use serde_json::json;
use tokio_tungstenite::tungstenite::{self, Message};

use notifyhub_entity::notification::NotificationType;
use notifyhub_realtime::PushPayload;
use notifyhub_realtime::connection::close_code;
use notifyhub_service::NewNotification;
use notifyhub_store::NotificationStore;
use notifyhub_worker::Processed;

use helpers::{TestApp, next_close_code, next_json};

async fn send_json(socket: &mut helpers::TestSocket, value: serde_json::Value) {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .expect("Failed to send frame");
}

#[tokio::test]
async fn test_handshake_without_token_is_rejected() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let err = tokio_tungstenite::connect_async(format!("ws://{addr}/ws?userId=u1"))
        .await
        .expect_err("Handshake should fail");
    match err {
        tungstenite::Error::Http(response) => assert_eq!(response.status(), 401),
        other => panic!("Expected HTTP rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_with_foreign_token_is_rejected() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let url = format!("ws://{addr}/ws?userId=u1&token={}", app.token("u2"));
    assert!(tokio_tungstenite::connect_async(url).await.is_err());
    assert_eq!(app.state.connections().connection_count(), 0);
}

#[tokio::test]
async fn test_connection_established_then_ping() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let mut socket = app.connect(addr, "aff-1").await;

    let hello = next_json(&mut socket).await;
    assert_eq!(hello["type"], "connection_established");
    assert_eq!(hello["userId"], "aff-1");
    assert_eq!(hello["subscriptions"], json!(["general", "user_aff-1"]));

    send_json(&mut socket, json!({"type": "ping"})).await;
    assert_eq!(next_json(&mut socket).await["type"], "pong");

    send_json(&mut socket, json!({"type": "dance"})).await;
    let error = next_json(&mut socket).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "INVALID_MESSAGE");
}

#[tokio::test]
async fn test_topic_subscription_and_broadcast() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let mut socket = app.connect(addr, "aff-1").await;
    next_json(&mut socket).await;

    send_json(&mut socket, json!({"type": "subscribe", "channel": "offers"})).await;
    let ack = next_json(&mut socket).await;
    assert_eq!(ack["type"], "subscribed");
    assert_eq!(ack["channel"], "offers");

    send_json(&mut socket, json!({"type": "subscribe", "channel": "user_aff-2"})).await;
    assert_eq!(next_json(&mut socket).await["code"], "FORBIDDEN");

    let delivered = app
        .service()
        .broadcast_to_topic("offers", PushPayload::new("New offer", "CPA doubled"))
        .unwrap();
    assert_eq!(delivered, 1);

    let broadcast = next_json(&mut socket).await;
    assert_eq!(broadcast["type"], "broadcast");
    assert_eq!(broadcast["channel"], "offers");
    assert_eq!(broadcast["title"], "New offer");
}

#[tokio::test]
async fn test_delivery_and_mark_read_over_socket() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let mut socket = app.connect(addr, "aff-1").await;
    next_json(&mut socket).await;

    let created = app
        .service()
        .create_notification(NewNotification::new(
            "aff-1",
            NotificationType::ConversionApproved,
            "Conversion approved",
            "Order 1234 approved",
        ))
        .await
        .unwrap();

    let processed = app.worker().process_next().await.unwrap();
    assert!(matches!(processed, Processed::Attempted(_)));

    let pushed = next_json(&mut socket).await;
    assert_eq!(pushed["type"], "notification");
    assert_eq!(pushed["id"], created.id.to_string());
    assert_eq!(pushed["notificationType"], "conversion_approved");

    send_json(
        &mut socket,
        json!({"type": "mark_read", "notificationId": created.id.to_string()}),
    )
    .await;
    let confirmation = next_json(&mut socket).await;
    assert_eq!(confirmation["type"], "notification");
    assert_eq!(confirmation["data"]["action"], "mark_read");
    assert_eq!(confirmation["data"]["notificationId"], created.id.to_string());

    let stored = app
        .service()
        .store()
        .get_notification(created.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.read_at.is_some());
}

#[tokio::test]
async fn test_connection_limit_evicts_oldest() {
    let app = TestApp::with_config(|c| c.realtime.max_connections_per_user = 1);
    let addr = app.spawn().await;

    let mut first = app.connect(addr, "aff-1").await;
    next_json(&mut first).await;
    let mut second = app.connect(addr, "aff-1").await;
    next_json(&mut second).await;

    assert_eq!(next_close_code(&mut first).await, close_code::POLICY_VIOLATION);
    assert_eq!(app.state.connections().user_connection_count(&"aff-1".into()), 1);
}

#[tokio::test]
async fn test_close_all_sends_going_away() {
    let app = TestApp::new();
    let addr = app.spawn().await;
    let mut socket = app.connect(addr, "aff-1").await;
    next_json(&mut socket).await;

    let closed = app
        .state
        .connections()
        .close_all(close_code::GOING_AWAY, "Server shutting down");
    assert_eq!(closed, 1);
    assert_eq!(next_close_code(&mut socket).await, close_code::GOING_AWAY);
}
