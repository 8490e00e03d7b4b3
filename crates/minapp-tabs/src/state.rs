//! Tab session lifecycle state machine
//!
//! ```text
//! Initializing
//!   ↓ ready
//! Ready ⇄ Navigating
//!   ↓ close / unmount
//! Closing
//!   ↓ teardown complete
//! Closed
//! ```
//!
//! `Home` has no surface and can only move to `Closing`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Placeholder tab without a surface
    Home,
    /// Surface created, initial load issued, waiting for the first ready event
    Initializing,
    /// Document ready, no navigation in flight
    Ready,
    /// A navigation is being decided or is in flight
    Navigating,
    /// Teardown has started; events are no longer processed
    Closing,
    /// Terminal
    Closed,
}

impl LifecycleState {
    /// Check if transition to another state is valid
    pub fn can_transition_to(&self, target: LifecycleState) -> bool {
        match (self, target) {
            (LifecycleState::Closed, _) => false,
            (LifecycleState::Closing, LifecycleState::Closed) => true,
            (LifecycleState::Closing, _) => false,
            // Close is reachable from every live state
            (_, LifecycleState::Closing) => true,
            (LifecycleState::Initializing, LifecycleState::Ready) => true,
            (LifecycleState::Ready, LifecycleState::Navigating) => true,
            (LifecycleState::Navigating, LifecycleState::Ready) => true,
            // Same state is a no-op
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    /// Returns true while surface events should still be handled
    pub fn is_live(&self) -> bool {
        !matches!(self, LifecycleState::Closing | LifecycleState::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Home => "home",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Ready => "ready",
            LifecycleState::Navigating => "navigating",
            LifecycleState::Closing => "closing",
            LifecycleState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
