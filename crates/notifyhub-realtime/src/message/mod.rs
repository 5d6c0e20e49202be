//! Client/server message protocol.

pub mod types;
pub mod validator;

pub use types::{ClientMessage, PushPayload, ServerMessage};
