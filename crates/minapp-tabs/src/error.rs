//! Tab error types

use thiserror::Error;

/// Failures reported by a rendering surface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Surface already destroyed")]
    Destroyed,

    #[error("Surface operation failed: {0}")]
    Failed(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),
}

#[derive(Error, Debug)]
pub enum TabError {
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Surface unavailable for {op}")]
    SurfaceUnavailable { op: &'static str },

    #[error("Failed to register listener: {0}")]
    ListenerRegistration(SurfaceError),

    #[error("Failed to remove listener: {0}")]
    ListenerRemoval(SurfaceError),

    #[error("Failed to clear site data: {0}")]
    StorageClear(String),

    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
