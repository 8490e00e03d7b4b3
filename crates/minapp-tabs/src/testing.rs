//! Recording fakes for the surface contract.
//!
//! `FakeSurface` records every call, keeps its listeners, and lets tests emit
//! lifecycle events synthetically.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::SurfaceError;
use crate::surface::{
    EventDisposition, ListenerToken, RenderSurface, StorageKind, SurfaceEvent, SurfaceEventKind,
    SurfaceFactory, SurfaceListener, SurfaceStorage,
};
use crate::tab::Tab;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Load(String),
    Reload,
    SetUserAgent(String),
    Destroy,
    InjectScript(String),
    Subscribe(SurfaceEventKind),
    Unsubscribe(ListenerToken),
}

#[derive(Default)]
pub struct FakeStorage {
    clears: Mutex<Vec<Vec<StorageKind>>>,
    fail: AtomicBool,
}

impl FakeStorage {
    pub fn clear_count(&self) -> usize {
        self.clears.lock().len()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SurfaceStorage for FakeStorage {
    async fn clear_storage_data(&self, kinds: &[StorageKind]) -> Result<(), SurfaceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SurfaceError::Failed("clearStorageData rejected".to_string()));
        }
        self.clears.lock().push(kinds.to_vec());
        Ok(())
    }
}

#[derive(Default)]
struct FakeState {
    calls: Vec<SurfaceCall>,
    listeners: HashMap<ListenerToken, (SurfaceEventKind, SurfaceListener)>,
    /// Every listener ever registered, to simulate callbacks already in flight
    history: Vec<(SurfaceEventKind, SurfaceListener)>,
    current_url: Option<String>,
    destroyed: bool,
    destroy_count: usize,
}

#[derive(Default)]
pub struct FakeSurface {
    state: Mutex<FakeState>,
    storage: Arc<FakeStorage>,
    next_token: AtomicU64,
    fail_subscribe: AtomicBool,
    fail_unsubscribe: AtomicBool,
    fail_script: AtomicBool,
}

impl FakeSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.lock().calls.clone()
    }

    pub fn loads(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::Load(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn destroy_count(&self) -> usize {
        self.state.lock().destroy_count
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Currently registered listeners
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    pub fn storage(&self) -> Arc<FakeStorage> {
        Arc::clone(&self.storage)
    }

    pub fn set_fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_unsubscribe(&self, fail: bool) {
        self.fail_unsubscribe.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_script(&self, fail: bool) {
        self.fail_script.store(fail, Ordering::SeqCst);
    }

    /// Deliver an event to the listeners registered for its kind.
    ///
    /// Returns `PreventDefault` if any listener asked for it.
    pub fn emit(&self, event: SurfaceEvent) -> EventDisposition {
        let kind = event.kind();
        let listeners: Vec<SurfaceListener> = self
            .state
            .lock()
            .listeners
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, l)| Arc::clone(l))
            .collect();

        Self::dispatch(&listeners, &event)
    }

    /// Deliver an event to every listener ever registered for its kind,
    /// including ones already unsubscribed.
    pub fn emit_to_all(&self, event: SurfaceEvent) -> EventDisposition {
        let kind = event.kind();
        let listeners: Vec<SurfaceListener> = self
            .state
            .lock()
            .history
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, l)| Arc::clone(l))
            .collect();

        Self::dispatch(&listeners, &event)
    }

    fn dispatch(listeners: &[SurfaceListener], event: &SurfaceEvent) -> EventDisposition {
        let mut disposition = EventDisposition::Continue;
        for listener in listeners {
            if listener(event) == EventDisposition::PreventDefault {
                disposition = EventDisposition::PreventDefault;
            }
        }
        disposition
    }

    fn record(&self, call: SurfaceCall) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SurfaceError::Destroyed);
        }
        state.calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl RenderSurface for FakeSurface {
    fn load(&self, url: &str) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::Load(url.to_string()))?;
        self.state.lock().current_url = Some(url.to_string());
        Ok(())
    }

    fn reload(&self) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::Reload)
    }

    fn set_user_agent(&self, user_agent: &str) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::SetUserAgent(user_agent.to_string()))
    }

    fn current_url(&self) -> Option<String> {
        self.state.lock().current_url.clone()
    }

    fn session_handle(&self) -> Option<Arc<dyn SurfaceStorage>> {
        let storage: Arc<dyn SurfaceStorage> = self.storage.clone();
        Some(storage)
    }

    fn destroy(&self) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        state.destroy_count += 1;
        if state.destroyed {
            return Err(SurfaceError::Destroyed);
        }
        state.destroyed = true;
        state.calls.push(SurfaceCall::Destroy);
        Ok(())
    }

    async fn inject_script(&self, code: &str) -> Result<serde_json::Value, SurfaceError> {
        self.record(SurfaceCall::InjectScript(code.to_string()))?;
        if self.fail_script.load(Ordering::SeqCst) {
            return Err(SurfaceError::Script("ReferenceError".to_string()));
        }
        Ok(serde_json::Value::Null)
    }

    fn subscribe(
        &self,
        kind: SurfaceEventKind,
        listener: SurfaceListener,
    ) -> Result<ListenerToken, SurfaceError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(SurfaceError::Failed("addEventListener threw".to_string()));
        }
        self.record(SurfaceCall::Subscribe(kind))?;

        let token = ListenerToken::new(self.next_token.fetch_add(1, Ordering::SeqCst));
        let mut state = self.state.lock();
        state.listeners.insert(token, (kind, Arc::clone(&listener)));
        state.history.push((kind, listener));
        Ok(token)
    }

    fn unsubscribe(&self, token: ListenerToken) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::Unsubscribe(token))?;
        let mut state = self.state.lock();
        // Detach even when reporting failure, like an engine that throws late
        state.listeners.remove(&token);
        if self.fail_unsubscribe.load(Ordering::SeqCst) {
            return Err(SurfaceError::Failed("removeEventListener threw".to_string()));
        }
        Ok(())
    }
}

/// Hands out `FakeSurface`s and remembers which tab got which
#[derive(Default)]
pub struct FakeSurfaceFactory {
    created: Mutex<Vec<(String, Arc<FakeSurface>)>>,
    fail: AtomicBool,
}

impl FakeSurfaceFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn surface_for(&self, tab_id: &str) -> Option<Arc<FakeSurface>> {
        self.created
            .lock()
            .iter()
            .find(|(id, _)| id == tab_id)
            .map(|(_, s)| Arc::clone(s))
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }
}

impl SurfaceFactory for FakeSurfaceFactory {
    fn create(&self, tab: &Tab) -> Result<Arc<dyn RenderSurface>, SurfaceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SurfaceError::Failed("webview could not be created".to_string()));
        }
        let fake = FakeSurface::new();
        self.created.lock().push((tab.id.clone(), Arc::clone(&fake)));
        let surface: Arc<dyn RenderSurface> = fake;
        Ok(surface)
    }
}
