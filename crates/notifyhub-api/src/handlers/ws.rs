//! WebSocket upgrade handler.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use notifyhub_core::types::UserId;
use notifyhub_realtime::{ConnectionRegistry, ServerMessage};
use notifyhub_realtime::connection::{ConnectionHandle, close_code};

use crate::error::ApiResult;
use crate::state::AppState;

/// How long the writer gets to flush a close frame after the reader stops.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handshake query parameters.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    pub user_id: Option<String>,
    /// JWT access token.
    pub token: Option<String>,
}

/// GET /ws?userId={id}&token={jwt}
///
/// Authenticates before upgrading; a missing or invalid credential is
/// answered with 401 and no socket is opened.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> ApiResult<Response> {
    let user_id = state
        .authenticator
        .authenticate(query.user_id.as_deref(), query.token.as_deref())
        .inspect_err(|e| debug!(error = %e, "WebSocket handshake rejected"))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(state, user_id, socket)))
}

async fn handle_socket(state: AppState, user_id: UserId, socket: WebSocket) {
    let (ws_tx, mut ws_rx) = socket.split();
    let connections = state.connections().clone();

    let (handle, outbound_rx) = connections.register(user_id.clone());
    let conn_id = handle.id;

    let writer = tokio::spawn(forward_outbound(handle.clone(), outbound_rx, ws_tx));

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            _ = handle.closed() => break,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                if let Some(action) = connections.handle_inbound(&conn_id, text.as_str()) {
                    state
                        .notifications
                        .handle_inbound_action(&conn_id, action)
                        .await;
                }
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                connections.touch(&conn_id);
            }
            Some(Ok(Message::Binary(_))) => {
                connections.send(
                    &conn_id,
                    ServerMessage::error("INVALID_MESSAGE", "Binary frames are not supported"),
                );
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(e)) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    release(connections, handle, writer).await;

    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection closed");
}

/// Drops the connection from the registry, then gives the writer a bounded
/// time to flush its close frame. The slot is free before the drain starts.
async fn release(
    connections: Arc<ConnectionRegistry>,
    handle: Arc<ConnectionHandle>,
    writer: JoinHandle<()>,
) {
    handle.close(close_code::NORMAL, "Connection closed");
    connections.unregister(&handle.id);

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        debug!(conn_id = %handle.id, "Writer did not finish in time");
    }
}

/// Serializes queued server messages onto the socket until the registry
/// closes the connection, then sends the close frame.
async fn forward_outbound(
    handle: Arc<ConnectionHandle>,
    mut outbound_rx: mpsc::Receiver<ServerMessage>,
    mut ws_tx: SplitSink<WebSocket, Message>,
) {
    loop {
        tokio::select! {
            biased;
            msg = outbound_rx.recv() => {
                let Some(msg) = msg else { break };
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(conn_id = %handle.id, error = %e, "Failed to serialize message");
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    debug!(conn_id = %handle.id, error = %e, "WebSocket write failed");
                    // Wakes the reader so the connection is released.
                    handle.close(close_code::GOING_AWAY, "Transport write failed");
                    return;
                }
            }
            _ = handle.closed() => break,
        }
    }

    let frame = handle.close_frame().map(|frame| CloseFrame {
        code: frame.code,
        reason: frame.reason.clone().into(),
    });
    let _ = ws_tx.send(Message::Close(frame)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifyhub_core::config::realtime::RealtimeConfig;

    #[tokio::test(start_paused = true)]
    async fn test_release_frees_slot_before_writer_drains() {
        let connections = Arc::new(ConnectionRegistry::new(RealtimeConfig::default()));
        let user = UserId::new("u1");
        let (handle, _rx) = connections.register(user.clone());
        let stuck_writer = tokio::spawn(std::future::pending::<()>());

        let task = tokio::spawn(release(connections.clone(), handle.clone(), stuck_writer));
        tokio::task::yield_now().await;

        assert_eq!(connections.connection_count(), 0);
        assert_eq!(connections.user_connection_count(&user), 0);
        assert_eq!(handle.close_frame().map(|f| f.code), Some(close_code::NORMAL));

        // The drain gives up after its timeout.
        task.await.unwrap();
    }
}
