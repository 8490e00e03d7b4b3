//! MinApp Tab Sessions
//!
//! One `TabSession` per mini-app tab. A session exclusively owns its
//! `RenderSurface`, routes every navigation the surface attempts through the
//! `NavigationPolicy`, and runs the teardown protocol when the tab closes.
//!
//! ```text
//! Initializing → Ready ⇄ Navigating
//!       ↓          ↓         ↓
//!       └──────→ Closing ←───┘   (Home → Closing as well)
//!                  ↓
//!                Closed
//! ```

mod config;
mod error;
mod home;
mod session;
mod state;
mod store;
mod surface;
mod tab;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{SessionConfig, DEFAULT_USER_AGENT, ERROR_SUPPRESSION_SCRIPT};
pub use error::{SurfaceError, TabError};
pub use home::HomeSurface;
pub use session::{SessionContext, TabSession};
pub use state::LifecycleState;
pub use store::{TabStore, UiState};
pub use surface::{
    EventDisposition, ListenerToken, RenderSurface, StorageKind, SurfaceEvent, SurfaceEventKind,
    SurfaceFactory, SurfaceListener, SurfaceStorage,
};
pub use tab::{Tab, TabPatch};

pub type Result<T> = std::result::Result<T, TabError>;
