//! Challenge loop detection state
//!
//! Some sign-in providers bounce the surface between the same MFA challenge
//! URL forever. The state here records the last challenge URL seen, when it
//! was last allowed, and how many times it repeated inside the window.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopState {
    pub last_challenge_url: Option<String>,
    pub challenge_timestamp: Option<Instant>,
    pub challenge_repeat_count: u32,
}

/// Side effect a policy decision has on the loop state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopUpdate {
    Unchanged,
    /// Start a fresh detection window for `url`, counter back to zero
    Start { url: String, at: Instant },
    /// The recorded challenge URL repeated inside the window
    Repeat { count: u32, at: Instant },
    /// Loop protection tripped: the counter stops at `count` and the window
    /// keeps running from the last allowed visit
    Hold { count: u32 },
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `url` is the recorded challenge URL and `now` is still inside
    /// the window opened by the last allowed visit.
    pub fn is_repeat(&self, url: &str, now: Instant, window: Duration) -> bool {
        match (&self.last_challenge_url, self.challenge_timestamp) {
            (Some(last), Some(at)) if last == url => now.saturating_duration_since(at) < window,
            _ => false,
        }
    }

    pub fn apply(&mut self, update: &LoopUpdate) {
        match update {
            LoopUpdate::Unchanged => {}
            LoopUpdate::Start { url, at } => {
                self.last_challenge_url = Some(url.clone());
                self.challenge_timestamp = Some(*at);
                self.challenge_repeat_count = 0;
            }
            LoopUpdate::Repeat { count, at } => {
                self.challenge_timestamp = Some(*at);
                self.challenge_repeat_count = *count;
            }
            LoopUpdate::Hold { count } => {
                self.challenge_repeat_count = *count;
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
