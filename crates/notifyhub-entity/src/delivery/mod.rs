//! Delivery outcomes.

pub mod result;

pub use result::DeliveryResult;
