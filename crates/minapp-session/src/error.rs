//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Tab not found: {0}")]
    NotFound(String),

    #[error("Failed to create surface: {0}")]
    SurfaceCreation(minapp_tabs::SurfaceError),

    #[error("Tab error: {0}")]
    Tab(#[from] minapp_tabs::TabError),

    #[error("Registry has shut down")]
    ShutDown,
}
