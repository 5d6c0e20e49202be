//! # notifyhub-entity
//!
//! Domain entity models for NotifyHub: notifications, per-user channel
//! preferences, delivery outcomes and render templates. Everything derives
//! `Debug`, `Clone`, `Serialize` and `Deserialize`; wire names are
//! camelCase to match the client protocol.

pub mod channel;
pub mod delivery;
pub mod notification;
pub mod template;
