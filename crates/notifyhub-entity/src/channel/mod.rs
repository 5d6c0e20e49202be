//! Delivery channels and per-user channel preferences.

pub mod kind;
pub mod preference;

pub use kind::ChannelKind;
pub use preference::ChannelPreference;
