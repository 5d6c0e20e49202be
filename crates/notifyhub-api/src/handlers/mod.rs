//! Route handlers.

pub mod health;
pub mod internal;
pub mod notification;
pub mod ws;
