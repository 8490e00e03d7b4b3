//! Host facade
//!
//! `MinApp` wires config, policy, shared UI state and the session registry
//! together and is the only thing a host talks to.

use parking_lot::Mutex;
use std::sync::Arc;

use minapp_navigation::NavigationPolicy;
use minapp_session::{SessionError, TabSessionRegistry};
use minapp_tabs::{HomeSurface, SessionContext, SurfaceFactory, Tab, TabSession, TabStore, UiState};

use crate::config::Config;
use crate::error::CoreError;
use crate::notifier::{LogNotifier, NotificationLevel, Notifier};
use crate::Result;

pub struct MinApp {
    config: Config,
    store: TabStore,
    registry: Mutex<TabSessionRegistry>,
    notifier: Arc<dyn Notifier>,
}

impl MinApp {
    pub fn new(config: Config, factory: Arc<dyn SurfaceFactory>) -> Result<Self> {
        Self::with_notifier(config, factory, Arc::new(LogNotifier))
    }

    pub fn with_notifier(
        config: Config,
        factory: Arc<dyn SurfaceFactory>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        config.validate()?;

        let policy = NavigationPolicy::new(config.policy.clone())?;
        let store = TabStore::new();
        let ctx = SessionContext {
            config: Arc::new(config.session.clone()),
            policy: Arc::new(policy),
            store: store.clone(),
        };
        let home = HomeSurface::new(config.home_title.clone());
        let registry = TabSessionRegistry::new(ctx, factory, home);

        tracing::info!("MinApp initialized");

        Ok(Self {
            config,
            store,
            registry: Mutex::new(registry),
            notifier,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared UI state the tab strip renders
    pub fn store(&self) -> &TabStore {
        &self.store
    }

    pub fn state(&self) -> UiState {
        self.store.snapshot()
    }

    // === Overlay visibility ===

    /// Toggle the browser overlay, returning the new visibility
    pub fn open(&self) -> bool {
        let visible = !self.store.browser_visible();
        self.store.set_browser_visible(visible);
        tracing::debug!(visible, "Toggled browser overlay");
        visible
    }

    /// Hide the browser overlay; tabs stay alive
    pub fn close(&self) {
        self.store.set_browser_visible(false);
        tracing::debug!("Hid browser overlay");
    }

    pub fn is_visible(&self) -> bool {
        self.store.browser_visible()
    }

    // === Tabs ===

    pub fn tabs(&self) -> Vec<Tab> {
        self.store.tabs()
    }

    pub fn active_tab(&self) -> Option<Tab> {
        self.store.snapshot().active_tab().cloned()
    }

    pub fn session(&self, tab_id: &str) -> Option<TabSession> {
        self.registry.lock().session(tab_id)
    }

    pub fn new_tab(&self) -> Result<Tab> {
        let result = self.registry.lock().new_tab().map_err(CoreError::from);
        self.report(result, "Could not open a new tab")
    }

    /// Open a mini-app in a new tab and show the overlay
    pub fn open_app(&self, url: &str, title: &str) -> Result<Tab> {
        let result = self
            .registry
            .lock()
            .open_app(url, title)
            .map_err(CoreError::from);
        let tab = self.report(result, "Could not open mini-app")?;
        self.store.set_browser_visible(true);
        Ok(tab)
    }

    /// Close a tab; the sole remaining tab and unknown ids are ignored
    pub fn close_tab(&self, tab_id: &str) -> bool {
        self.registry.lock().close(tab_id)
    }

    pub fn activate(&self, tab_id: &str) -> bool {
        self.registry.lock().set_active(tab_id)
    }

    /// Reload a tab's surface; home tabs have nothing to reload
    pub fn reload_tab(&self, tab_id: &str) -> Result<()> {
        let result = self.require_session(tab_id).and_then(|session| {
            if session.is_home() {
                return Ok(());
            }
            session.reload().map_err(CoreError::from)
        });
        self.report(result, "Could not reload tab")
    }

    /// Clear cookies and site data for a tab, then reload it
    pub async fn clear_site_data(&self, tab_id: &str) -> Result<()> {
        let session = match self.require_session(tab_id) {
            Ok(session) => session,
            Err(e) => return self.report(Err(e), "Could not clear site data"),
        };

        if session.is_home() {
            return Ok(());
        }

        let result = session.clear_site_data().await.map_err(CoreError::from);
        let result = self.report(result, "Could not clear site data");
        if result.is_ok() {
            self.notifier
                .notify(NotificationLevel::Info, "Site data cleared");
        }
        result
    }

    /// Tear down every tab, including ones waiting on a deferred destroy
    pub fn shutdown(&self) {
        self.registry.lock().shutdown();
        self.store.set_browser_visible(false);
        tracing::info!("MinApp shut down");
    }

    fn require_session(&self, tab_id: &str) -> Result<TabSession> {
        self.registry
            .lock()
            .session(tab_id)
            .ok_or_else(|| CoreError::Session(SessionError::NotFound(tab_id.to_string())))
    }

    fn report<T>(&self, result: Result<T>, action: &str) -> Result<T> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "{}", action);
            self.notifier
                .notify(NotificationLevel::Error, &format!("{action}: {e}"));
        }
        result
    }
}
