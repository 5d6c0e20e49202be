//! Core type definitions used across the NotifyHub workspace.

pub mod id;
pub mod pagination;

pub use id::*;
pub use pagination::Pagination;
