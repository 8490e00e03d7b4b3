//! Navigation policy
//!
//! Pure decision logic: nothing here touches a surface. The caller owns the
//! `LoopState` and applies the returned `LoopUpdate` itself.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use url::Url;

use crate::config::PolicyConfig;
use crate::loop_guard::{LoopState, LoopUpdate};
use crate::Result;

/// What caused the navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NavigationTrigger {
    /// Link click or script-initiated navigation inside the surface
    UserNavigation,
    /// Server or client redirect
    Redirect,
    /// `window.open` / target=_blank
    Popup,
}

impl NavigationTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationTrigger::UserNavigation => "user-navigation",
            NavigationTrigger::Redirect => "redirect",
            NavigationTrigger::Popup => "popup",
        }
    }
}

impl std::fmt::Display for NavigationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockReason {
    MalformedUrl,
    LoopProtection,
    UpstreamError,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::MalformedUrl => "malformed-url",
            BlockReason::LoopProtection => "loop-protection",
            BlockReason::UpstreamError => "upstream-error",
        }
    }
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
    /// Let the surface proceed
    Allow,
    /// Cancel the popup and load its target inside the same surface
    AllowExternalLoad { url: String },
    /// Cancel the navigation
    Block(BlockReason),
    /// Cancel now, then issue a fresh top-level load after the debounce
    BlockAndReload { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: NavigationAction,
    pub loop_update: LoopUpdate,
}

impl Decision {
    fn new(action: NavigationAction) -> Self {
        Self {
            action,
            loop_update: LoopUpdate::Unchanged,
        }
    }
}

pub struct NavigationPolicy {
    config: PolicyConfig,
    trusted_hosts: HashSet<String>,
}

impl NavigationPolicy {
    pub fn new(config: PolicyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PolicyConfig) -> Self {
        let trusted_hosts = config
            .trusted_auth_hosts
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        Self {
            config,
            trusted_hosts,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Decide what to do with a navigation from `current_url` to `target_url`
    pub fn decide(
        &self,
        current_url: &str,
        target_url: &str,
        trigger: NavigationTrigger,
        loop_state: &LoopState,
        now: Instant,
    ) -> Decision {
        let target = match Url::parse(target_url) {
            Ok(url) if !url.cannot_be_a_base() => url,
            _ => return Decision::new(NavigationAction::Block(BlockReason::MalformedUrl)),
        };

        if self.is_trusted_host(&target) {
            let path = target.path().to_lowercase();

            if self.matches_any(&path, &self.config.challenge_path_markers) {
                return self.decide_challenge(target_url, loop_state, now);
            }

            if self.matches_any(&path, &self.config.error_path_markers) {
                return Decision::new(NavigationAction::Block(BlockReason::UpstreamError));
            }

            return Decision::new(NavigationAction::Allow);
        }

        let same_origin = Url::parse(current_url)
            .map(|current| current.origin() == target.origin())
            .unwrap_or(false);

        if same_origin {
            return Decision::new(NavigationAction::Allow);
        }

        let url = target_url.to_string();
        match trigger {
            NavigationTrigger::Popup => Decision::new(NavigationAction::AllowExternalLoad { url }),
            NavigationTrigger::Redirect | NavigationTrigger::UserNavigation => {
                Decision::new(NavigationAction::BlockAndReload { url })
            }
        }
    }

    fn decide_challenge(&self, target_url: &str, loop_state: &LoopState, now: Instant) -> Decision {
        let threshold = self.config.challenge_repeat_threshold;

        if !loop_state.is_repeat(target_url, now, self.config.challenge_window()) {
            return Decision {
                action: NavigationAction::Allow,
                loop_update: LoopUpdate::Start {
                    url: target_url.to_string(),
                    at: now,
                },
            };
        }

        let count = loop_state.challenge_repeat_count.saturating_add(1);
        if count >= threshold {
            tracing::debug!(
                url = %target_url,
                repeat_count = loop_state.challenge_repeat_count,
                "Challenge loop detected"
            );
            return Decision {
                action: NavigationAction::Block(BlockReason::LoopProtection),
                loop_update: LoopUpdate::Hold {
                    count: count.min(threshold),
                },
            };
        }

        Decision {
            action: NavigationAction::Allow,
            loop_update: LoopUpdate::Repeat { count, at: now },
        }
    }

    /// Whether `url` is on one of the trusted auth hosts
    pub fn is_trusted_auth_url(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|parsed| self.is_trusted_host(&parsed))
            .unwrap_or(false)
    }

    fn is_trusted_host(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.trusted_hosts.contains(&host.to_lowercase()))
            .unwrap_or(false)
    }

    fn matches_any(&self, path: &str, markers: &[String]) -> bool {
        markers
            .iter()
            .any(|marker| !marker.is_empty() && path.contains(&marker.to_lowercase()))
    }
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        Self::build(PolicyConfig::default())
    }
}
