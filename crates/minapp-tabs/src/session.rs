//! Tab session
//!
//! Owns one surface, its listener tokens, loop-detection state and pending
//! timers. Every callback holds only a `Weak` reference to the session and
//! re-checks liveness before touching the surface. The session lock is never
//! held while calling into the surface, so a surface that emits events
//! synchronously from inside `load` cannot deadlock it.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;

use minapp_navigation::{
    BlockReason, LoopState, NavigationAction, NavigationPolicy, NavigationTrigger,
};

use crate::config::SessionConfig;
use crate::error::TabError;
use crate::state::LifecycleState;
use crate::store::TabStore;
use crate::surface::{
    EventDisposition, ListenerToken, RenderSurface, StorageKind, SurfaceEvent, SurfaceEventKind,
    SurfaceListener, SurfaceStorage,
};
use crate::tab::{Tab, TabPatch};
use crate::Result;

/// Generic net failure and aborted load; both show up whenever a navigation
/// is cancelled or a subresource is refused.
const BENIGN_LOAD_ERRORS: &[i32] = &[-2, -3];

/// Collaborators shared by every session of a registry
#[derive(Clone)]
pub struct SessionContext {
    pub config: Arc<SessionConfig>,
    pub policy: Arc<NavigationPolicy>,
    pub store: TabStore,
}

struct SessionCore {
    state: LifecycleState,
    surface: Option<Arc<dyn RenderSurface>>,
    url: String,
    loop_state: LoopState,
    listeners: Vec<ListenerToken>,
    initial_load_issued: bool,
    reload_timer: Option<JoinHandle<()>>,
    destroy_timer: Option<JoinHandle<()>>,
}

impl SessionCore {
    fn transition_to(&mut self, tab_id: &str, new_state: LifecycleState) -> Result<()> {
        if !self.state.can_transition_to(new_state) {
            return Err(TabError::InvalidTransition {
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }

        if self.state != new_state {
            tracing::debug!(
                tab_id = %tab_id,
                from = %self.state,
                to = %new_state,
                "Session state transition"
            );
            self.state = new_state;
        }

        Ok(())
    }

    /// Navigation finished, one way or another
    fn settle(&mut self, tab_id: &str) {
        if self.state == LifecycleState::Navigating {
            let _ = self.transition_to(tab_id, LifecycleState::Ready);
        }
    }
}

/// Work left after the listeners are released
struct PendingTeardown {
    /// Isolated storage that must be cleared before the surface is destroyed
    storage: Option<Arc<dyn SurfaceStorage>>,
}

struct SessionInner {
    tab_id: String,
    isolated: bool,
    ctx: SessionContext,
    core: Mutex<SessionCore>,
}

#[derive(Clone)]
pub struct TabSession {
    inner: Arc<SessionInner>,
}

impl TabSession {
    /// Session for a mini-app tab backed by `surface`
    pub fn new(tab: &Tab, surface: Arc<dyn RenderSurface>, ctx: SessionContext) -> Self {
        Self::build(tab, Some(surface), LifecycleState::Initializing, ctx)
    }

    /// Session for a placeholder tab; it never owns a surface
    pub fn home(tab: &Tab, ctx: SessionContext) -> Self {
        Self::build(tab, None, LifecycleState::Home, ctx)
    }

    fn build(
        tab: &Tab,
        surface: Option<Arc<dyn RenderSurface>>,
        state: LifecycleState,
        ctx: SessionContext,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                tab_id: tab.id.clone(),
                isolated: tab.isolated,
                ctx,
                core: Mutex::new(SessionCore {
                    state,
                    surface,
                    url: tab.url.clone(),
                    loop_state: LoopState::new(),
                    listeners: Vec::new(),
                    initial_load_issued: false,
                    reload_timer: None,
                    destroy_timer: None,
                }),
            }),
        }
    }

    pub fn tab_id(&self) -> &str {
        &self.inner.tab_id
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.core.lock().state
    }

    pub fn is_home(&self) -> bool {
        self.state() == LifecycleState::Home
    }

    pub fn is_closed(&self) -> bool {
        self.state() == LifecycleState::Closed
    }

    pub fn has_surface(&self) -> bool {
        self.inner.core.lock().surface.is_some()
    }

    /// Last requested or committed URL
    pub fn current_url(&self) -> String {
        self.inner.core.lock().url.clone()
    }

    pub fn loop_state(&self) -> LoopState {
        self.inner.core.lock().loop_state.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.core.lock().listeners.len()
    }

    /// Register listeners and issue the initial load.
    ///
    /// Safe to call again on re-render: listeners are only registered once and
    /// the initial load is never reissued.
    pub fn mount(&self) -> Result<()> {
        let (surface, url) = {
            let mut core = self.inner.core.lock();
            if core.state != LifecycleState::Initializing || core.initial_load_issued {
                return Ok(());
            }
            let Some(surface) = core.surface.clone() else {
                return Ok(());
            };
            core.initial_load_issued = true;
            (surface, core.url.clone())
        };

        let mut tokens = Vec::with_capacity(SurfaceEventKind::ALL.len());
        for kind in SurfaceEventKind::ALL {
            match surface.subscribe(kind, self.listener()) {
                Ok(token) => tokens.push(token),
                Err(e) => {
                    let err = TabError::ListenerRegistration(e);
                    tracing::warn!(tab_id = %self.inner.tab_id, ?kind, "{}", err);
                }
            }
        }

        let still_live = {
            let mut core = self.inner.core.lock();
            if core.state.is_live() {
                core.listeners.extend(tokens.iter().copied());
                true
            } else {
                false
            }
        };

        if !still_live {
            // Closed while registering; hand the tokens straight back
            self.inner.unregister(&surface, tokens);
            return Ok(());
        }

        tracing::debug!(tab_id = %self.inner.tab_id, url = %url, "Issuing initial load");
        surface.load(&url)?;
        Ok(())
    }

    fn listener(&self) -> SurfaceListener {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move |event: &SurfaceEvent| match weak.upgrade() {
            Some(inner) => inner.handle_event(event),
            None => EventDisposition::Continue,
        })
    }

    /// Reload the current document
    pub fn reload(&self) -> Result<()> {
        match self.inner.live_surface("reload") {
            Some(surface) => Ok(surface.reload()?),
            None => Ok(()),
        }
    }

    /// Issue a top-level load
    pub fn load(&self, url: &str) -> Result<()> {
        let Some(surface) = self.inner.live_surface("load") else {
            return Ok(());
        };
        self.inner.core.lock().url = url.to_string();
        Ok(surface.load(url)?)
    }

    pub fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        match self.inner.live_surface("set_user_agent") {
            Some(surface) => Ok(surface.set_user_agent(user_agent)?),
            None => Ok(()),
        }
    }

    /// Evaluate a script in the embedded content; `None` when there is no live surface
    pub async fn inject_script(&self, code: &str) -> Result<Option<serde_json::Value>> {
        match self.inner.live_surface("inject_script") {
            Some(surface) => Ok(Some(surface.inject_script(code).await?)),
            None => Ok(None),
        }
    }

    /// Clear cookies and site data for this tab, then reload it
    pub async fn clear_site_data(&self) -> Result<()> {
        let surface = self
            .inner
            .live_surface("clear_site_data")
            .ok_or_else(|| TabError::StorageClear("surface unavailable".to_string()))?;
        let storage = surface
            .session_handle()
            .ok_or_else(|| TabError::StorageClear("no session handle".to_string()))?;

        storage
            .clear_storage_data(&StorageKind::ALL)
            .await
            .map_err(|e| TabError::StorageClear(e.to_string()))?;

        tracing::info!(tab_id = %self.inner.tab_id, "Cleared site data");

        // The session may have closed while the clear was in flight
        self.reload()
    }

    /// Close the tab.
    ///
    /// Sessions last seen on a trusted auth host keep their surface alive for
    /// the configured delay so an in-flight sign-in redirect is not aborted;
    /// every other session is released immediately.
    pub fn close(&self) {
        let Some(pending) = self.inner.begin_teardown() else {
            return;
        };

        let defer = {
            let core = self.inner.core.lock();
            core.surface.is_some() && self.inner.ctx.policy.is_trusted_auth_url(&core.url)
        };
        let delay = defer.then(|| self.inner.ctx.config.auth_destroy_delay());

        if delay.is_none() && pending.storage.is_none() {
            self.inner.finish_teardown();
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let tab_id = self.inner.tab_id.clone();
        let timer = spawn(async move {
            if let Some(storage) = pending.storage {
                clear_isolated_storage(&tab_id, storage.as_ref()).await;
            }
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(inner) = weak.upgrade() {
                inner.core.lock().destroy_timer.take();
                inner.finish_teardown();
            }
        });

        match timer {
            Some(handle) => {
                if let Some(delay) = delay {
                    tracing::debug!(
                        tab_id = %self.inner.tab_id,
                        delay_ms = delay.as_millis() as u64,
                        "Deferring surface destroy during auth flow"
                    );
                }
                self.inner.core.lock().destroy_timer = Some(handle);
            }
            None => {
                tracing::warn!(
                    tab_id = %self.inner.tab_id,
                    "No runtime available for deferred teardown, destroying now"
                );
                self.inner.finish_teardown();
            }
        }
    }

    /// Run the whole teardown now, cancelling any deferred destroy
    pub fn teardown_now(&self) {
        let pending = self.inner.begin_teardown();
        if let Some(handle) = self.inner.core.lock().destroy_timer.take() {
            handle.abort();
        }

        // Nothing waits for this clear; the surface goes away regardless
        if let Some(storage) = pending.and_then(|p| p.storage) {
            let tab_id = self.inner.tab_id.clone();
            let cleared = spawn(async move {
                clear_isolated_storage(&tab_id, storage.as_ref()).await;
            });
            if cleared.is_none() {
                tracing::warn!(tab_id = %self.inner.tab_id, "No runtime available to clear isolated storage");
            }
        }

        self.inner.finish_teardown();
    }
}

impl SessionInner {
    /// The surface, if the session is still live; logs otherwise
    fn live_surface(&self, op: &'static str) -> Option<Arc<dyn RenderSurface>> {
        let core = self.core.lock();
        let surface = core.surface.clone().filter(|_| core.state.is_live());
        if surface.is_none() {
            let err = TabError::SurfaceUnavailable { op };
            tracing::warn!(tab_id = %self.tab_id, state = %core.state, "{}", err);
        }
        surface
    }

    fn handle_event(self: &Arc<Self>, event: &SurfaceEvent) -> EventDisposition {
        if !self.core.lock().state.is_live() {
            tracing::debug!(tab_id = %self.tab_id, kind = ?event.kind(), "Dropping event for closed session");
            return EventDisposition::Continue;
        }

        match event {
            SurfaceEvent::Ready => {
                self.on_ready();
                EventDisposition::Continue
            }
            SurfaceEvent::NavigationIntent { url, trigger } => self.on_navigation(url, *trigger),
            SurfaceEvent::Redirect { url } => self.on_navigation(url, NavigationTrigger::Redirect),
            SurfaceEvent::Committed { url } => {
                {
                    let mut core = self.core.lock();
                    core.url = url.clone();
                    core.settle(&self.tab_id);
                }
                self.ctx.store.update_tab(&self.tab_id, &TabPatch::url(url.clone()));
                EventDisposition::Continue
            }
            SurfaceEvent::LoadFailed { code, url } => {
                if BENIGN_LOAD_ERRORS.contains(code) {
                    tracing::debug!(tab_id = %self.tab_id, code, url = %url, "Ignoring non-critical load failure");
                } else {
                    tracing::warn!(tab_id = %self.tab_id, code, url = %url, "Load failed");
                }
                self.core.lock().settle(&self.tab_id);
                EventDisposition::Continue
            }
            SurfaceEvent::TitleChanged { title } => {
                self.ctx.store.update_tab(&self.tab_id, &TabPatch::title(title.clone()));
                EventDisposition::Continue
            }
            SurfaceEvent::FaviconChanged { url } => {
                self.ctx.store.update_tab(&self.tab_id, &TabPatch::favicon(url.clone()));
                EventDisposition::Continue
            }
        }
    }

    fn on_ready(&self) {
        let surface = {
            let mut core = self.core.lock();
            match core.state {
                LifecycleState::Initializing => {
                    let _ = core.transition_to(&self.tab_id, LifecycleState::Ready);
                }
                _ => core.settle(&self.tab_id),
            }
            core.surface.clone()
        };
        let Some(surface) = surface else {
            return;
        };

        if let Err(e) = surface.set_user_agent(&self.ctx.config.user_agent) {
            tracing::warn!(tab_id = %self.tab_id, error = %e, "Failed to set user agent");
        }

        let tab_id = self.tab_id.clone();
        let script = self.ctx.config.error_suppression_script.clone();
        let injected = spawn(async move {
            if let Err(e) = surface.inject_script(&script).await {
                tracing::debug!(tab_id = %tab_id, error = %e, "Error suppression hook not installed");
            }
        });
        if injected.is_none() {
            tracing::debug!(tab_id = %self.tab_id, "No runtime available for script injection");
        }
    }

    fn on_navigation(self: &Arc<Self>, target: &str, trigger: NavigationTrigger) -> EventDisposition {
        let mut core = self.core.lock();
        // Teardown may have started since the event was accepted
        if !core.state.is_live() {
            return EventDisposition::Continue;
        }
        let decision = self.ctx.policy.decide(
            &core.url,
            target,
            trigger,
            &core.loop_state,
            tokio::time::Instant::now().into_std(),
        );
        core.loop_state.apply(&decision.loop_update);

        if core.state == LifecycleState::Ready {
            let _ = core.transition_to(&self.tab_id, LifecycleState::Navigating);
        }

        tracing::debug!(
            tab_id = %self.tab_id,
            url = %target,
            trigger = %trigger,
            action = ?decision.action,
            "Navigation decided"
        );

        match decision.action {
            NavigationAction::Allow => EventDisposition::Continue,
            NavigationAction::AllowExternalLoad { url } => {
                core.url = url.clone();
                let surface = core.surface.clone();
                drop(core);
                if let Some(surface) = surface {
                    if let Err(e) = surface.load(&url) {
                        tracing::warn!(tab_id = %self.tab_id, url = %url, error = %e, "Failed to load popup target");
                    }
                }
                EventDisposition::PreventDefault
            }
            NavigationAction::Block(reason) => {
                core.settle(&self.tab_id);
                match reason {
                    BlockReason::MalformedUrl => {
                        tracing::debug!(tab_id = %self.tab_id, url = %target, "Blocked malformed navigation")
                    }
                    BlockReason::LoopProtection => tracing::warn!(
                        tab_id = %self.tab_id,
                        url = %target,
                        repeat_count = core.loop_state.challenge_repeat_count,
                        "Blocked challenge redirect loop"
                    ),
                    BlockReason::UpstreamError => {
                        tracing::warn!(tab_id = %self.tab_id, url = %target, "Blocked upstream error page")
                    }
                }
                EventDisposition::PreventDefault
            }
            NavigationAction::BlockAndReload { url } => {
                core.settle(&self.tab_id);
                if let Some(previous) = core.reload_timer.take() {
                    previous.abort();
                }

                let weak = Arc::downgrade(self);
                let delay = self.ctx.config.reload_debounce();
                let target = url.clone();
                match spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(inner) = Weak::upgrade(&weak) {
                        inner.fire_reload(&target);
                    }
                }) {
                    Some(handle) => core.reload_timer = Some(handle),
                    None => {
                        drop(core);
                        tracing::warn!(tab_id = %self.tab_id, "No runtime for reload debounce, loading immediately");
                        self.fire_reload(&url);
                    }
                }
                EventDisposition::PreventDefault
            }
        }
    }

    fn fire_reload(&self, url: &str) {
        let surface = {
            let mut core = self.core.lock();
            core.reload_timer.take();
            if !core.state.is_live() {
                tracing::debug!(tab_id = %self.tab_id, url = %url, "Session closed before deferred reload");
                return;
            }
            core.url = url.to_string();
            if core.state == LifecycleState::Ready {
                let _ = core.transition_to(&self.tab_id, LifecycleState::Navigating);
            }
            core.surface.clone()
        };

        if let Some(surface) = surface {
            tracing::debug!(tab_id = %self.tab_id, url = %url, "Reloading cross-origin target");
            if let Err(e) = surface.load(url) {
                tracing::warn!(tab_id = %self.tab_id, url = %url, error = %e, "Deferred reload failed");
            }
        }
    }

    /// Step 1: stop handling events and release listeners. Hands back the
    /// isolated storage still to be cleared; `None` when teardown had
    /// already started.
    fn begin_teardown(&self) -> Option<PendingTeardown> {
        let (surface, tokens) = {
            let mut core = self.core.lock();
            if !core.state.is_live() {
                return None;
            }
            let _ = core.transition_to(&self.tab_id, LifecycleState::Closing);
            if let Some(timer) = core.reload_timer.take() {
                timer.abort();
            }
            (core.surface.clone(), std::mem::take(&mut core.listeners))
        };

        let Some(surface) = surface else {
            return Some(PendingTeardown { storage: None });
        };

        self.unregister(&surface, tokens);

        let storage = if self.isolated {
            let storage = surface.session_handle();
            if storage.is_none() {
                tracing::warn!(tab_id = %self.tab_id, "Isolated tab has no session handle to clear");
            }
            storage
        } else {
            None
        };

        Some(PendingTeardown { storage })
    }

    /// Steps 3 and 4: destroy the surface once and mark the session closed
    fn finish_teardown(&self) {
        let surface = {
            let mut core = self.core.lock();
            if core.state == LifecycleState::Closed {
                return;
            }
            let _ = core.transition_to(&self.tab_id, LifecycleState::Closed);
            core.surface.take()
        };

        if let Some(surface) = surface {
            if let Err(e) = surface.destroy() {
                tracing::warn!(tab_id = %self.tab_id, error = %e, "Error destroying surface");
            }
        }

        tracing::debug!(tab_id = %self.tab_id, "Session closed");
    }

    fn unregister(&self, surface: &Arc<dyn RenderSurface>, tokens: Vec<ListenerToken>) {
        for token in tokens {
            if let Err(e) = surface.unsubscribe(token) {
                let err = TabError::ListenerRemoval(e);
                tracing::warn!(tab_id = %self.tab_id, token = token.id(), "{}", err);
            }
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let core = self.core.get_mut();
        if let Some(timer) = core.reload_timer.take() {
            timer.abort();
        }
        if let Some(surface) = core.surface.take() {
            tracing::warn!(tab_id = %self.tab_id, "Session dropped without teardown");
            let _ = surface.destroy();
        }
    }
}

/// Step 2 for isolated tabs; failures are logged and teardown continues
async fn clear_isolated_storage(tab_id: &str, storage: &dyn SurfaceStorage) {
    if let Err(e) = storage.clear_storage_data(&StorageKind::ALL).await {
        let err = TabError::StorageClear(e.to_string());
        tracing::warn!(tab_id = %tab_id, "{}", err);
    }
}

fn spawn<F>(future: F) -> Option<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::runtime::Handle::try_current()
        .ok()
        .map(|handle| handle.spawn(future))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSurface, SurfaceCall};
    use std::time::Duration;

    const APP_URL: &str = "https://app.example.com/chat";
    const CHALLENGE: &str = "https://auth.openai.com/u/mfa-otp-challenge?x=1";

    fn context() -> SessionContext {
        SessionContext {
            config: Arc::new(SessionConfig::default()),
            policy: Arc::new(NavigationPolicy::default()),
            store: TabStore::new(),
        }
    }

    fn mounted(url: &str, ctx: SessionContext) -> (TabSession, Arc<FakeSurface>) {
        let tab = Tab::new(url.to_string(), "App".to_string()).unwrap();
        ctx.store.push_tab(tab.clone());
        let surface = FakeSurface::new();
        let session = TabSession::new(&tab, surface.clone(), ctx);
        session.mount().unwrap();
        (session, surface)
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_issues_initial_load_once() {
        let (session, surface) = mounted(APP_URL, context());

        session.mount().unwrap();
        surface.emit(SurfaceEvent::Ready);
        session.mount().unwrap();

        assert_eq!(surface.loads(), vec![APP_URL.to_string()]);
        assert_eq!(session.listener_count(), SurfaceEventKind::ALL.len());
        assert_eq!(session.state(), LifecycleState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_sets_user_agent_and_injects_hook() {
        let (_session, surface) = mounted(APP_URL, context());

        surface.emit(SurfaceEvent::Ready);
        tokio::task::yield_now().await;

        let calls = surface.calls();
        assert!(calls.contains(&SurfaceCall::SetUserAgent(
            crate::config::DEFAULT_USER_AGENT.to_string()
        )));
        assert!(calls
            .iter()
            .any(|c| matches!(c, SurfaceCall::InjectScript(code) if code.contains("unhandledrejection"))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_injection_failure_is_swallowed() {
        let (session, surface) = mounted(APP_URL, context());
        surface.set_fail_script(true);

        surface.emit(SurfaceEvent::Ready);
        tokio::task::yield_now().await;

        assert_eq!(session.state(), LifecycleState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cross_origin_redirect_reloads_once_after_debounce() {
        let (session, surface) = mounted(APP_URL, context());
        surface.emit(SurfaceEvent::Ready);

        let disposition = surface.emit(SurfaceEvent::Redirect {
            url: "https://cdn.tracker.com/x".to_string(),
        });
        assert_eq!(disposition, EventDisposition::PreventDefault);
        assert_eq!(surface.loads(), vec![APP_URL.to_string()]);

        tokio::time::sleep(Duration::from_millis(150)).await;

        let tracker_loads = surface
            .loads()
            .into_iter()
            .filter(|u| u == "https://cdn.tracker.com/x")
            .count();
        assert_eq!(tracker_loads, 1);
        assert_eq!(session.current_url(), "https://cdn.tracker.com/x");
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_redirects_debounce_to_latest_target() {
        let (_session, surface) = mounted(APP_URL, context());
        surface.emit(SurfaceEvent::Ready);

        surface.emit(SurfaceEvent::Redirect {
            url: "https://one.other.com/".to_string(),
        });
        surface.emit(SurfaceEvent::Redirect {
            url: "https://two.other.com/".to_string(),
        });
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(
            surface.loads(),
            vec![APP_URL.to_string(), "https://two.other.com/".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_reload() {
        let (session, surface) = mounted(APP_URL, context());
        surface.emit(SurfaceEvent::Ready);

        surface.emit(SurfaceEvent::Redirect {
            url: "https://cdn.tracker.com/x".to_string(),
        });
        session.close();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(surface.loads(), vec![APP_URL.to_string()]);
        assert!(session.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_origin_navigation_allowed_and_committed() {
        let ctx = context();
        let (session, surface) = mounted(APP_URL, ctx.clone());
        surface.emit(SurfaceEvent::Ready);

        let disposition = surface.emit(SurfaceEvent::NavigationIntent {
            url: "https://app.example.com/settings".to_string(),
            trigger: NavigationTrigger::UserNavigation,
        });
        assert_eq!(disposition, EventDisposition::Continue);
        assert_eq!(session.state(), LifecycleState::Navigating);

        surface.emit(SurfaceEvent::Committed {
            url: "https://app.example.com/settings".to_string(),
        });
        assert_eq!(session.state(), LifecycleState::Ready);
        assert_eq!(
            ctx.store.tab(session.tab_id()).unwrap().url,
            "https://app.example.com/settings"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_popup_loads_in_same_surface() {
        let (_session, surface) = mounted(APP_URL, context());
        surface.emit(SurfaceEvent::Ready);

        let disposition = surface.emit(SurfaceEvent::NavigationIntent {
            url: "https://docs.other.com/help".to_string(),
            trigger: NavigationTrigger::Popup,
        });

        assert_eq!(disposition, EventDisposition::PreventDefault);
        assert_eq!(
            surface.loads(),
            vec![APP_URL.to_string(), "https://docs.other.com/help".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_challenge_loop_scenario() {
        let (session, surface) = mounted(CHALLENGE, context());
        surface.emit(SurfaceEvent::Ready);

        let mut dispositions = Vec::new();
        for _ in 0..3 {
            dispositions.push(surface.emit(SurfaceEvent::Redirect {
                url: CHALLENGE.to_string(),
            }));
            tokio::time::advance(Duration::from_millis(300)).await;
        }

        assert_eq!(
            dispositions,
            vec![
                EventDisposition::Continue,
                EventDisposition::Continue,
                EventDisposition::PreventDefault
            ]
        );
        assert_eq!(session.loop_state().challenge_repeat_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_events_update_store() {
        let ctx = context();
        let (session, surface) = mounted(APP_URL, ctx.clone());

        surface.emit(SurfaceEvent::TitleChanged {
            title: "Chat".to_string(),
        });
        surface.emit(SurfaceEvent::FaviconChanged {
            url: Some("https://app.example.com/icon.png".to_string()),
        });

        let tab = ctx.store.tab(session.tab_id()).unwrap();
        assert_eq!(tab.title, "Chat");
        assert_eq!(
            tab.favicon_url.as_deref(),
            Some("https://app.example.com/icon.png")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_is_idempotent_and_ordered() {
        let (session, surface) = mounted(APP_URL, context());

        session.close();
        session.close();
        session.teardown_now();

        assert!(session.is_closed());
        assert!(!session.has_surface());
        assert_eq!(session.listener_count(), 0);
        assert_eq!(surface.destroy_count(), 1);
        assert_eq!(surface.listener_count(), 0);

        let calls = surface.calls();
        let last_unsubscribe = calls
            .iter()
            .rposition(|c| matches!(c, SurfaceCall::Unsubscribe(_)))
            .unwrap();
        let destroy = calls.iter().position(|c| *c == SurfaceCall::Destroy).unwrap();
        assert!(last_unsubscribe < destroy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_failure_does_not_block_teardown() {
        let (session, surface) = mounted(APP_URL, context());
        surface.set_fail_unsubscribe(true);

        session.close();

        assert!(session.is_closed());
        assert_eq!(surface.destroy_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operations_after_close_are_noops() {
        let (session, surface) = mounted(APP_URL, context());
        session.close();
        let calls_before = surface.calls().len();

        assert!(session.reload().is_ok());
        assert!(session.load("https://app.example.com/other").is_ok());
        assert!(session.set_user_agent("agent").is_ok());
        assert!(matches!(session.inject_script("1 + 1").await, Ok(None)));

        // Events racing in after close are dropped
        let disposition = surface.emit_to_all(SurfaceEvent::Redirect {
            url: "https://cdn.tracker.com/x".to_string(),
        });
        assert_eq!(disposition, EventDisposition::Continue);

        assert_eq!(surface.calls().len(), calls_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_isolated_tab_clears_storage_on_close() {
        let ctx = context();
        let tab = Tab::new(APP_URL.to_string(), "App".to_string())
            .unwrap()
            .with_isolation(true);
        let surface = FakeSurface::new();
        let session = TabSession::new(&tab, surface.clone(), ctx);
        session.mount().unwrap();

        session.close();
        // Destroy waits for the clear
        assert_eq!(session.state(), LifecycleState::Closing);
        assert_eq!(surface.listener_count(), 0);
        assert_eq!(surface.destroy_count(), 0);

        tokio::task::yield_now().await;

        assert_eq!(surface.storage().clear_count(), 1);
        assert_eq!(surface.destroy_count(), 1);
        assert!(session.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_isolated_clear_failure_still_destroys() {
        let ctx = context();
        let tab = Tab::new(APP_URL.to_string(), "App".to_string())
            .unwrap()
            .with_isolation(true);
        let surface = FakeSurface::new();
        surface.storage().set_fail(true);
        let session = TabSession::new(&tab, surface.clone(), ctx);
        session.mount().unwrap();

        session.close();
        tokio::task::yield_now().await;

        assert_eq!(surface.storage().clear_count(), 0);
        assert_eq!(surface.destroy_count(), 1);
        assert!(session.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_isolated_auth_session_clears_then_waits() {
        let ctx = context();
        let tab = Tab::new("https://auth.openai.com/log-in".to_string(), "Sign in".to_string())
            .unwrap()
            .with_isolation(true);
        let surface = FakeSurface::new();
        let session = TabSession::new(&tab, surface.clone(), ctx);
        session.mount().unwrap();

        session.close();
        tokio::task::yield_now().await;
        assert_eq!(surface.storage().clear_count(), 1);
        assert_eq!(surface.destroy_count(), 0);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(surface.destroy_count(), 1);
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_listener_registration_failure_still_loads() {
        let ctx = context();
        let tab = Tab::new(APP_URL.to_string(), "App".to_string()).unwrap();
        let surface = FakeSurface::new();
        surface.set_fail_subscribe(true);
        let session = TabSession::new(&tab, surface.clone(), ctx);

        assert!(session.mount().is_ok());
        assert_eq!(session.listener_count(), 0);
        assert_eq!(surface.listener_count(), 0);
        assert_eq!(surface.loads(), vec![APP_URL.to_string()]);

        session.close();
        assert!(session.is_closed());
        assert_eq!(surface.destroy_count(), 1);
    }

    #[tokio::test]
    async fn test_navigation_after_teardown_started_is_ignored() {
        let (session, surface) = mounted("https://auth.openai.com/log-in", context());
        let listener = session.listener();

        session.close();
        assert_eq!(session.state(), LifecycleState::Closing);
        let loads_before = surface.loads().len();

        let disposition = session.inner.on_navigation(
            "https://cdn.example.com/popup",
            NavigationTrigger::Popup,
        );
        assert_eq!(disposition, EventDisposition::Continue);

        let disposition = listener(&SurfaceEvent::NavigationIntent {
            url: "https://cdn.example.com/popup".to_string(),
            trigger: NavigationTrigger::Popup,
        });
        assert_eq!(disposition, EventDisposition::Continue);
        assert_eq!(surface.loads().len(), loads_before);

        session.teardown_now();
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_session_destroy_is_deferred() {
        let (session, surface) = mounted("https://auth.openai.com/log-in", context());

        session.close();
        assert_eq!(session.state(), LifecycleState::Closing);
        assert_eq!(surface.destroy_count(), 0);
        assert_eq!(surface.listener_count(), 0);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(session.is_closed());
        assert_eq!(surface.destroy_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_now_cancels_deferred_destroy() {
        let (session, surface) = mounted("https://auth.openai.com/log-in", context());

        session.close();
        session.teardown_now();
        assert_eq!(surface.destroy_count(), 1);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(surface.destroy_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_site_data_reloads() {
        let (session, surface) = mounted(APP_URL, context());

        session.clear_site_data().await.unwrap();

        assert_eq!(surface.storage().clear_count(), 1);
        assert!(surface.calls().contains(&SurfaceCall::Reload));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_site_data_failure_reported() {
        let (session, surface) = mounted(APP_URL, context());
        surface.storage().set_fail(true);

        let result = session.clear_site_data().await;
        assert!(matches!(result, Err(TabError::StorageClear(_))));
        assert!(!surface.calls().contains(&SurfaceCall::Reload));
    }

    #[test]
    fn test_home_session_has_no_surface() {
        let ctx = context();
        let tab = Tab::home("New Tab".to_string());
        let session = TabSession::home(&tab, ctx);

        assert!(session.is_home());
        session.mount().unwrap();
        assert!(session.reload().is_ok());

        session.close();
        assert!(session.is_closed());
    }
}
