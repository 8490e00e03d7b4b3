//! MinApp Session Registry
//!
//! - Ordered tab sessions, insertion order is display order
//! - Exactly one active tab; the registry is never left empty by `close`
//! - Every mutation is mirrored synchronously into the shared `TabStore`
//! - Closed sessions that are still mid auth flow stay hidden until their
//!   deferred destroy fires or the registry shuts down

mod error;
mod registry;

pub use error::SessionError;
pub use registry::TabSessionRegistry;

pub type Result<T> = std::result::Result<T, SessionError>;
