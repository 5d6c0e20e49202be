//! Background delivery for NotifyHub.
//!
//! This crate provides:
//! - the delivery worker that drains the queue and applies status transitions
//! - the channel dispatcher that performs one attempt per enabled channel
//! - the retry policy that spaces out attempts after a total failure

pub mod dispatcher;
pub mod retry;
pub mod runner;

pub use dispatcher::{ChannelDispatcher, DispatchError};
pub use retry::RetryPolicy;
pub use runner::{DeliveryReport, DeliveryWorker, Processed};
