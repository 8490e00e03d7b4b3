//! Rendering surface capability contract
//!
//! The embeddable web view is provided by the host runtime. Sessions only see
//! it through `RenderSurface`, which keeps the session logic testable against
//! a recording fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use minapp_navigation::NavigationTrigger;

use crate::error::SurfaceError;
use crate::tab::Tab;

/// Callback registered for one event kind.
///
/// Returning `PreventDefault` from a navigation-intent or redirect handler
/// cancels that navigation; other events ignore the return value.
pub type SurfaceListener = Arc<dyn Fn(&SurfaceEvent) -> EventDisposition + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

impl ListenerToken {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceEventKind {
    Ready,
    NavigationIntent,
    Redirect,
    Committed,
    LoadFailed,
    TitleChanged,
    FaviconChanged,
}

impl SurfaceEventKind {
    pub const ALL: [SurfaceEventKind; 7] = [
        SurfaceEventKind::Ready,
        SurfaceEventKind::NavigationIntent,
        SurfaceEventKind::Redirect,
        SurfaceEventKind::Committed,
        SurfaceEventKind::LoadFailed,
        SurfaceEventKind::TitleChanged,
        SurfaceEventKind::FaviconChanged,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// DOM ready for the current document
    Ready,
    /// The surface wants to navigate (click, script, popup)
    NavigationIntent {
        url: String,
        trigger: NavigationTrigger,
    },
    /// A redirect is about to be followed
    Redirect { url: String },
    /// A navigation committed
    Committed { url: String },
    /// A load failed; `code` uses the engine's net error numbering
    LoadFailed { code: i32, url: String },
    TitleChanged { title: String },
    FaviconChanged { url: Option<String> },
}

impl SurfaceEvent {
    pub fn kind(&self) -> SurfaceEventKind {
        match self {
            SurfaceEvent::Ready => SurfaceEventKind::Ready,
            SurfaceEvent::NavigationIntent { .. } => SurfaceEventKind::NavigationIntent,
            SurfaceEvent::Redirect { .. } => SurfaceEventKind::Redirect,
            SurfaceEvent::Committed { .. } => SurfaceEventKind::Committed,
            SurfaceEvent::LoadFailed { .. } => SurfaceEventKind::LoadFailed,
            SurfaceEvent::TitleChanged { .. } => SurfaceEventKind::TitleChanged,
            SurfaceEvent::FaviconChanged { .. } => SurfaceEventKind::FaviconChanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Continue,
    PreventDefault,
}

/// Site data partitions that can be cleared for a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Cookies,
    LocalStorage,
    Caches,
    IndexedDb,
    ServiceWorkers,
}

impl StorageKind {
    pub const ALL: [StorageKind; 5] = [
        StorageKind::Cookies,
        StorageKind::LocalStorage,
        StorageKind::Caches,
        StorageKind::IndexedDb,
        StorageKind::ServiceWorkers,
    ];
}

/// Session-scoped storage behind a surface (cookies, site data)
#[async_trait]
pub trait SurfaceStorage: Send + Sync {
    async fn clear_storage_data(&self, kinds: &[StorageKind]) -> Result<(), SurfaceError>;
}

/// One embeddable web-content instance.
///
/// `load` does not emit a navigation-intent event for the load it issues.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    fn load(&self, url: &str) -> Result<(), SurfaceError>;

    fn reload(&self) -> Result<(), SurfaceError>;

    fn set_user_agent(&self, user_agent: &str) -> Result<(), SurfaceError>;

    fn current_url(&self) -> Option<String>;

    fn session_handle(&self) -> Option<Arc<dyn SurfaceStorage>>;

    fn destroy(&self) -> Result<(), SurfaceError>;

    async fn inject_script(&self, code: &str) -> Result<serde_json::Value, SurfaceError>;

    fn subscribe(
        &self,
        kind: SurfaceEventKind,
        listener: SurfaceListener,
    ) -> Result<ListenerToken, SurfaceError>;

    fn unsubscribe(&self, token: ListenerToken) -> Result<(), SurfaceError>;
}

/// Creates the surface for a newly opened mini-app tab
pub trait SurfaceFactory: Send + Sync {
    fn create(&self, tab: &Tab) -> Result<Arc<dyn RenderSurface>, SurfaceError>;
}
