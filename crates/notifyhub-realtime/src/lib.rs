//! # notifyhub-realtime
//!
//! Real-time engine for NotifyHub. Provides:
//!
//! - the connection registry with per-user caps and idle reclamation
//! - topic subscriptions for broadcast fan-out
//! - the JSON client/server message protocol
//! - JWT handshake authentication

pub mod connection;
pub mod message;
pub mod metrics;
pub mod topic;

pub use connection::{ConnectionRegistry, HandshakeAuthenticator, InboundAction};
pub use message::{ClientMessage, PushPayload, ServerMessage};
pub use topic::GENERAL_TOPIC;
