//! Individual real-time connection handle.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use notifyhub_core::types::{ConnectionId, UserId};

use crate::message::types::ServerMessage;

/// WebSocket close code sent with a close frame.
pub mod close_code {
    /// Normal closure (idle timeout).
    pub const NORMAL: u16 = 1000;
    /// Server is shutting down.
    pub const GOING_AWAY: u16 = 1001;
    /// Policy violation (connection limit, failed handshake).
    pub const POLICY_VIOLATION: u16 = 1008;
}

/// Why the server closed a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

/// A handle to a single live connection.
///
/// Holds the sender for pushing messages to the transport task and the
/// bookkeeping the registry needs (activity, liveness, close reason). The
/// transport task watches [`ConnectionHandle::closed`] to learn that the
/// registry closed the connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// User who owns this connection.
    pub user_id: UserId,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<ServerMessage>,
    /// Unix millis of the last inbound message.
    last_activity: AtomicI64,
    alive: AtomicBool,
    close_frame: OnceLock<CloseFrame>,
    shutdown: CancellationToken,
}

impl ConnectionHandle {
    pub fn new(user_id: UserId, sender: mpsc::Sender<ServerMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: ConnectionId::new(),
            user_id,
            connected_at: now,
            sender,
            last_activity: AtomicI64::new(now.timestamp_millis()),
            alive: AtomicBool::new(true),
            close_frame: OnceLock::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Queue a message for the client without waiting.
    ///
    /// Returns `false` when the message was dropped: the connection is
    /// closed or its buffer is full.
    pub fn send(&self, msg: ServerMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(
                    conn_id = %self.id,
                    kind = msg.kind(),
                    "Send buffer full, dropping message"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Close the connection with a WebSocket close code.
    ///
    /// Only the first close is recorded.
    pub fn close(&self, code: u16, reason: impl Into<String>) {
        let _ = self.close_frame.set(CloseFrame {
            code,
            reason: reason.into(),
        });
        self.mark_dead();
        self.shutdown.cancel();
    }

    /// The frame passed to the first [`close`](Self::close) call.
    pub fn close_frame(&self) -> Option<&CloseFrame> {
        self.close_frame.get()
    }

    /// Resolves once the connection has been closed by the server.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }

    /// Update last activity timestamp.
    pub fn touch(&self) {
        self.touch_at(Utc::now());
    }

    pub fn touch_at(&self, at: DateTime<Utc>) {
        self.last_activity
            .store(at.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn last_activity_millis(&self) -> i64 {
        self.last_activity.load(Ordering::SeqCst)
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.last_activity_millis())
            .single()
            .unwrap_or(self.connected_at)
    }

    /// Get a snapshot of connection info.
    pub fn info(&self, subscriptions: Vec<String>) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            user_id: self.user_id.clone(),
            connected_at: self.connected_at,
            last_activity: self.last_activity(),
            subscriptions,
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of connection info (serializable).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub subscriptions: Vec<String>,
    pub alive: bool,
}
