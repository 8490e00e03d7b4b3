//! Tab session registry
//!
//! Owns one `TabSession` per visible tab plus the sessions that were closed
//! while an auth redirect was still in flight. Structure changes (open, close,
//! activate) are mirrored into the shared `TabStore` before returning.

use std::sync::Arc;

use minapp_tabs::{HomeSurface, SessionContext, SurfaceFactory, Tab, TabPatch, TabSession};

use crate::error::SessionError;
use crate::Result;

pub struct TabSessionRegistry {
    /// Display order
    sessions: Vec<TabSession>,
    /// Hidden sessions waiting on a deferred destroy
    closing: Vec<TabSession>,
    ctx: SessionContext,
    factory: Arc<dyn SurfaceFactory>,
    home: HomeSurface,
    shut_down: bool,
}

impl TabSessionRegistry {
    /// Create a registry holding a single home tab
    pub fn new(ctx: SessionContext, factory: Arc<dyn SurfaceFactory>, home: HomeSurface) -> Self {
        let tab = home.tab();
        let mut registry = Self::empty(ctx, factory, home);
        registry.insert(TabSession::home(&tab, registry.ctx.clone()), tab);
        registry
    }

    /// Create a registry whose first tab is `initial`
    pub fn with_initial(
        ctx: SessionContext,
        factory: Arc<dyn SurfaceFactory>,
        home: HomeSurface,
        initial: Tab,
    ) -> Result<Self> {
        let mut registry = Self::empty(ctx, factory, home);
        registry.open(initial)?;
        Ok(registry)
    }

    fn empty(ctx: SessionContext, factory: Arc<dyn SurfaceFactory>, home: HomeSurface) -> Self {
        ctx.store.clear();
        Self {
            sessions: Vec::new(),
            closing: Vec::new(),
            ctx,
            factory,
            home,
            shut_down: false,
        }
    }

    /// Append a tab and make it active.
    ///
    /// Mini-app tabs get a fresh surface from the factory and issue their
    /// initial load here. Home tabs never get a surface.
    pub fn open(&mut self, tab: Tab) -> Result<Tab> {
        if self.shut_down {
            return Err(SessionError::ShutDown);
        }

        if tab.is_home {
            let session = TabSession::home(&tab, self.ctx.clone());
            self.insert(session, tab.clone());
            return Ok(tab);
        }

        let surface = self
            .factory
            .create(&tab)
            .map_err(SessionError::SurfaceCreation)?;
        let session = TabSession::new(&tab, surface, self.ctx.clone());
        let previous_active = self.ctx.store.active_tab_id();
        self.insert(session.clone(), tab.clone());

        if let Err(e) = session.mount() {
            tracing::warn!(tab_id = %tab.id, error = %e, "Failed to mount tab, rolling back");
            self.sessions.retain(|s| s.tab_id() != tab.id);
            self.ctx.store.remove_tab(&tab.id);
            session.teardown_now();
            if let Some(id) = previous_active {
                self.ctx.store.set_active(&id);
            }
            return Err(e.into());
        }

        Ok(tab)
    }

    fn insert(&mut self, session: TabSession, tab: Tab) {
        let tab_id = tab.id.clone();
        tracing::info!(
            tab_id = %tab_id,
            url = %tab.url,
            is_home = tab.is_home,
            "Opening tab"
        );

        self.sessions.push(session);
        self.ctx.store.push_tab(tab);
        self.ctx.store.set_active(&tab_id);
    }

    /// Open a fresh home tab
    pub fn new_tab(&mut self) -> Result<Tab> {
        let tab = self.home.tab();
        self.open(tab)
    }

    /// Open a mini-app at `url`
    pub fn open_app(&mut self, url: &str, title: &str) -> Result<Tab> {
        let tab = Tab::new(url.to_string(), title.to_string())?
            .with_isolation(self.ctx.config.isolate_by_default);
        self.open(tab)
    }

    /// Close a tab.
    ///
    /// Unknown ids and the sole remaining tab are ignored. If the closed tab
    /// was active, the tab to its left becomes active, else the new first tab.
    /// Returns whether a tab was closed.
    pub fn close(&mut self, tab_id: &str) -> bool {
        if self.sessions.len() <= 1 {
            tracing::debug!(tab_id = %tab_id, "Refusing to close the last tab");
            return false;
        }

        let Some(index) = self.sessions.iter().position(|s| s.tab_id() == tab_id) else {
            tracing::debug!(tab_id = %tab_id, "Close requested for unknown tab");
            return false;
        };

        let session = self.sessions.remove(index);
        let was_active = self.ctx.store.active_tab_id().as_deref() == Some(tab_id);
        self.ctx.store.remove_tab(tab_id);

        if was_active {
            let neighbor = &self.sessions[index.saturating_sub(1)];
            self.ctx.store.set_active(neighbor.tab_id());
        }

        tracing::info!(tab_id = %tab_id, remaining = self.sessions.len(), "Closing tab");

        session.close();
        self.closing.retain(|s| !s.is_closed());
        if !session.is_closed() {
            self.closing.push(session);
        }

        true
    }

    /// Activate a tab; unknown ids are ignored
    pub fn set_active(&mut self, tab_id: &str) -> bool {
        self.ctx.store.set_active(tab_id)
    }

    /// Merge `patch` into a tab's record; unknown ids are ignored
    pub fn update_tab(&mut self, tab_id: &str, patch: &TabPatch) -> Option<Tab> {
        self.ctx.store.update_tab(tab_id, patch)
    }

    pub fn get(&self, tab_id: &str) -> Option<Tab> {
        self.ctx.store.tab(tab_id)
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.ctx.store.tabs()
    }

    pub fn active_tab(&self) -> Option<Tab> {
        self.ctx.store.snapshot().active_tab().cloned()
    }

    pub fn active_tab_id(&self) -> Option<String> {
        self.ctx.store.active_tab_id()
    }

    pub fn session(&self, tab_id: &str) -> Option<TabSession> {
        self.sessions.iter().find(|s| s.tab_id() == tab_id).cloned()
    }

    /// Session for `tab_id`, or `NotFound`
    pub fn require_session(&self, tab_id: &str) -> Result<TabSession> {
        self.session(tab_id)
            .ok_or_else(|| SessionError::NotFound(tab_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Closed sessions whose surface has not been destroyed yet
    pub fn pending_teardowns(&mut self) -> usize {
        self.closing.retain(|s| !s.is_closed());
        self.closing.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Tear down every session now, including deferred ones
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        tracing::info!(
            open = self.sessions.len(),
            closing = self.closing.len(),
            "Shutting down tab registry"
        );

        for session in self.closing.drain(..) {
            session.teardown_now();
        }
        for session in self.sessions.drain(..) {
            session.teardown_now();
        }
        self.ctx.store.clear();
    }
}

impl Drop for TabSessionRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
