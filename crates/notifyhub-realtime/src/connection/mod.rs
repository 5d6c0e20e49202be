//! Connection lifecycle: handles, the per-user pool, the registry, handshake
//! authentication and the idle sweeper.

pub mod authenticator;
pub mod handle;
pub mod pool;
pub mod registry;
pub mod sweeper;

pub use authenticator::HandshakeAuthenticator;
pub use handle::{CloseFrame, ConnectionHandle, close_code};
pub use registry::{ConnectionRegistry, InboundAction};
