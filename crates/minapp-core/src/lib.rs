//! MinApp Core
//!
//! Host-facing layer for the embedded mini-app browser. The host owns one
//! `MinApp`, supplies a `SurfaceFactory` for its web view, and renders the
//! shared `TabStore`.

mod app;
mod config;
mod error;
mod notifier;

pub use app::MinApp;
pub use config::Config;
pub use error::CoreError;
pub use notifier::{LogNotifier, NotificationLevel, Notifier};

// Re-export the pieces hosts and tests need
pub use minapp_navigation::{NavigationError, NavigationPolicy, PolicyConfig};
pub use minapp_session::{SessionError, TabSessionRegistry};
pub use minapp_tabs::{
    HomeSurface, LifecycleState, RenderSurface, SessionConfig, SurfaceError, SurfaceFactory, Tab,
    TabError, TabPatch, TabSession, TabStore, UiState,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
