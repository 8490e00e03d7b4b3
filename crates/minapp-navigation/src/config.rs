//! Navigation policy configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::NavigationError;
use crate::Result;

/// Hosts that run federated sign-in flows and are exempt from the same-origin rule
const TRUSTED_AUTH_HOSTS: &[&str] = &[
    "auth.openai.com",
    "auth0.openai.com",
    "accounts.google.com",
    "login.microsoftonline.com",
    "appleid.apple.com",
];

/// Path fragments that identify a multi-factor challenge page
const CHALLENGE_PATH_MARKERS: &[&str] = &["mfa-otp-challenge", "mfa-challenge", "/u/mfa"];

/// Path fragments that identify an upstream error or rate-limit page
const ERROR_PATH_MARKERS: &[&str] = &["/error", "rate-limit", "too-many-requests"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Trusted auth hostnames (compared case-insensitively, exact match)
    pub trusted_auth_hosts: Vec<String>,
    /// Path substrings that mark a challenge navigation
    pub challenge_path_markers: Vec<String>,
    /// Path substrings that mark an upstream error page
    pub error_path_markers: Vec<String>,
    /// Window in which a repeated challenge URL counts as a loop
    pub challenge_window_ms: u64,
    /// Repeat count at which challenge navigations start being blocked
    pub challenge_repeat_threshold: u32,
}

impl PolicyConfig {
    pub fn challenge_window(&self) -> Duration {
        Duration::from_millis(self.challenge_window_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self
            .trusted_auth_hosts
            .iter()
            .any(|host| host.trim().is_empty())
        {
            return Err(NavigationError::InvalidConfig(
                "trusted auth host cannot be empty".to_string(),
            ));
        }

        if self.challenge_window_ms == 0 {
            return Err(NavigationError::InvalidConfig(
                "challenge window must be non-zero".to_string(),
            ));
        }

        if self.challenge_repeat_threshold == 0 {
            return Err(NavigationError::InvalidConfig(
                "challenge repeat threshold must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();

        Self {
            trusted_auth_hosts: owned(TRUSTED_AUTH_HOSTS),
            challenge_path_markers: owned(CHALLENGE_PATH_MARKERS),
            error_path_markers: owned(ERROR_PATH_MARKERS),
            challenge_window_ms: 2000,
            challenge_repeat_threshold: 2,
        }
    }
}
