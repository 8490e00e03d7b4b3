//! MinApp configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use minapp_navigation::PolicyConfig;
use minapp_tabs::{HomeSurface, SessionConfig};

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Navigation policy and loop detection
    pub policy: PolicyConfig,
    /// Surface setup and teardown timing
    pub session: SessionConfig,
    /// Title shown on placeholder tabs
    pub home_title: String,
}

impl Config {
    /// Load a JSON config file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json(&raw)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;

        if self.session.user_agent.trim().is_empty() {
            return Err(CoreError::Config("user_agent cannot be empty".to_string()));
        }
        if self.home_title.trim().is_empty() {
            return Err(CoreError::Config("home_title cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            session: SessionConfig::default(),
            home_title: HomeSurface::DEFAULT_TITLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.home_title, "New Tab");
        assert_eq!(config.session.reload_debounce_ms, 100);
        assert_eq!(config.session.auth_destroy_delay_ms, 1000);
        assert_eq!(config.policy.challenge_window_ms, 2000);
        assert_eq!(config.policy.challenge_repeat_threshold, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json(
            r#"{ "session": { "reload_debounce_ms": 250 }, "home_title": "Start" }"#,
        )
        .unwrap();

        assert_eq!(config.session.reload_debounce_ms, 250);
        assert_eq!(config.session.auth_destroy_delay_ms, 1000);
        assert_eq!(config.home_title, "Start");
        assert!(config
            .policy
            .trusted_auth_hosts
            .iter()
            .any(|h| h == "accounts.google.com"));
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let result = Config::from_json(r#"{ "policy": { "challenge_window_ms": 0 } }"#);
        assert!(matches!(result, Err(CoreError::Navigation(_))));
    }

    #[test]
    fn test_blank_user_agent_rejected() {
        let result = Config::from_json(r#"{ "session": { "user_agent": " " } }"#);
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = Config::from_json("{ not json");
        assert!(matches!(result, Err(CoreError::Serialization(_))));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("minapp-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "session": { "isolate_by_default": true } }"#).unwrap();

        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(config.session.isolate_by_default);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/minapp.json");
        assert!(matches!(result, Err(CoreError::Config(_))));
    }
}
