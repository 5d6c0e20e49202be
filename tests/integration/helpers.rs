//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use futures::StreamExt;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use notifyhub_api::{AppState, build_service};
use notifyhub_core::config::AppConfig;
use notifyhub_core::types::UserId;
use notifyhub_service::NotificationService;
use notifyhub_worker::DeliveryWorker;

pub const API_KEY: &str = "integration-key";
pub const JWT_SECRET: &str = "integration-secret";

pub type TestSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    pub state: AppState,
    pub config: AppConfig,
}

/// Response captured from a test request
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a test application after adjusting the default configuration
    pub fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = JWT_SECRET.to_string();
        config.auth.internal_api_key = API_KEY.to_string();
        config.auth.jwt_leeway_seconds = 0;
        adjust(&mut config);

        let service = build_service(&config).expect("Failed to build notification service");
        let state = AppState::new(Arc::new(config.clone()), Arc::new(service));
        let router = notifyhub_api::router::build_router(state.clone());

        Self {
            router,
            state,
            config,
        }
    }

    pub fn service(&self) -> &Arc<NotificationService> {
        &self.state.notifications
    }

    /// Worker bound to the same store, queue and connections
    pub fn worker(&self) -> DeliveryWorker {
        DeliveryWorker::new(self.service())
    }

    /// Signed access token for `user_id`
    pub fn token(&self, user_id: &str) -> String {
        self.state
            .authenticator
            .issue(&UserId::new(user_id), chrono::Duration::minutes(10))
            .expect("Failed to issue token")
    }

    /// Make a request as an end user
    pub async fn user_request(
        &self,
        method: &str,
        uri: &str,
        user_id: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let auth = format!("Bearer {}", self.token(user_id));
        self.request(method, uri, body, &[(header::AUTHORIZATION.as_str(), &auth)])
            .await
    }

    /// Make a request on the internal surface
    pub async fn internal_request(&self, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
        self.request(method, uri, body, &[("x-api-key", API_KEY)])
            .await
    }

    /// Make a request to the router
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("Failed to build request"),
            None => builder.body(Body::empty()).expect("Failed to build request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Serve the router on an ephemeral port
    pub async fn spawn(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let router = self.router.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        addr
    }

    /// Open an authenticated socket for `user_id`
    pub async fn connect(&self, addr: SocketAddr, user_id: &str) -> TestSocket {
        let url = format!(
            "ws://{addr}/ws?userId={user_id}&token={}",
            self.token(user_id)
        );
        let (socket, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("WebSocket handshake failed");
        socket
    }
}

/// Next text frame parsed as JSON, skipping control frames
pub async fn next_json(socket: &mut TestSocket) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Socket ended")
            .expect("Socket error");
        match frame {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("Frame is not JSON");
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Unexpected frame: {other:?}"),
        }
    }
}

/// Wait for the close frame and return its code
pub async fn next_close_code(socket: &mut TestSocket) -> u16 {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("Timed out waiting for close")
            .expect("Socket ended without a close frame")
            .expect("Socket error");
        if let Message::Close(frame) = frame {
            return frame.map(|f| u16::from(f.code)).unwrap_or(1005);
        }
    }
}
