//! Shared UI state read by the tab strip
//!
//! The registry is the only writer for structure (tabs, active id); sessions
//! write tab metadata (title, favicon, url) as their surface reports it.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::tab::{Tab, TabPatch};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiState {
    /// Display order
    pub tabs: Vec<Tab>,
    pub active_tab_id: Option<String>,
    /// Whether the browser overlay is shown
    pub browser_visible: bool,
}

impl UiState {
    pub fn active_tab(&self) -> Option<&Tab> {
        let id = self.active_tab_id.as_deref()?;
        self.tabs.iter().find(|t| t.id == id)
    }
}

#[derive(Clone, Default)]
pub struct TabStore {
    inner: Arc<RwLock<UiState>>,
}

impl TabStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> UiState {
        self.inner.read().clone()
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.inner.read().tabs.clone()
    }

    pub fn tab(&self, tab_id: &str) -> Option<Tab> {
        self.inner.read().tabs.iter().find(|t| t.id == tab_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().tabs.is_empty()
    }

    pub fn active_tab_id(&self) -> Option<String> {
        self.inner.read().active_tab_id.clone()
    }

    pub fn browser_visible(&self) -> bool {
        self.inner.read().browser_visible
    }

    pub fn set_browser_visible(&self, visible: bool) {
        self.inner.write().browser_visible = visible;
    }

    pub fn push_tab(&self, tab: Tab) {
        self.inner.write().tabs.push(tab);
    }

    /// Remove a tab, returning its former index. Clears the active id if it
    /// pointed at the removed tab.
    pub fn remove_tab(&self, tab_id: &str) -> Option<(usize, Tab)> {
        let mut state = self.inner.write();
        let index = state.tabs.iter().position(|t| t.id == tab_id)?;
        let tab = state.tabs.remove(index);
        if state.active_tab_id.as_deref() == Some(tab_id) {
            state.active_tab_id = None;
        }
        Some((index, tab))
    }

    /// Point the active id at `tab_id`; returns false for unknown ids
    pub fn set_active(&self, tab_id: &str) -> bool {
        let mut state = self.inner.write();
        if !state.tabs.iter().any(|t| t.id == tab_id) {
            return false;
        }
        state.active_tab_id = Some(tab_id.to_string());
        true
    }

    pub fn update_tab(&self, tab_id: &str, patch: &TabPatch) -> Option<Tab> {
        let mut state = self.inner.write();
        let tab = state.tabs.iter_mut().find(|t| t.id == tab_id)?;
        tab.apply(patch);
        Some(tab.clone())
    }

    pub fn clear(&self) {
        let mut state = self.inner.write();
        state.tabs.clear();
        state.active_tab_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_active_clears_pointer() {
        let store = TabStore::new();
        let a = Tab::home("A".to_string());
        let b = Tab::home("B".to_string());
        store.push_tab(a.clone());
        store.push_tab(b.clone());

        assert!(store.set_active(&b.id));
        assert_eq!(store.snapshot().active_tab().map(|t| t.title.as_str()), Some("B"));

        let (index, removed) = store.remove_tab(&b.id).unwrap();
        assert_eq!(index, 1);
        assert_eq!(removed.id, b.id);
        assert!(store.active_tab_id().is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_active_unknown_id() {
        let store = TabStore::new();
        let a = Tab::home("A".to_string());
        store.push_tab(a.clone());
        store.set_active(&a.id);

        assert!(!store.set_active("missing"));
        assert_eq!(store.active_tab_id(), Some(a.id));
    }

    #[test]
    fn test_update_unknown_tab() {
        let store = TabStore::new();
        assert!(store.update_tab("missing", &TabPatch::title("x")).is_none());
    }
}
