//! Per-session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outbound user agent applied on every ready event
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Keeps uncaught errors inside embedded content from reaching the host
pub const ERROR_SUPPRESSION_SCRIPT: &str = r#"
(() => {
  try {
    window.addEventListener('error', (event) => {
      console.log('Page error:', event);
      event.preventDefault();
      return false;
    });
    window.addEventListener('unhandledrejection', (event) => {
      console.log('Unhandled promise rejection:', event);
      event.preventDefault();
      return false;
    });
  } catch {}
})();
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub user_agent: String,
    pub error_suppression_script: String,
    /// Delay between cancelling a cross-origin navigation and reloading it
    pub reload_debounce_ms: u64,
    /// Delay before destroying a surface that was mid auth flow
    pub auth_destroy_delay_ms: u64,
    /// Default data-isolation flag for newly opened mini-app tabs
    pub isolate_by_default: bool,
}

impl SessionConfig {
    pub fn reload_debounce(&self) -> Duration {
        Duration::from_millis(self.reload_debounce_ms)
    }

    pub fn auth_destroy_delay(&self) -> Duration {
        Duration::from_millis(self.auth_destroy_delay_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            error_suppression_script: ERROR_SUPPRESSION_SCRIPT.to_string(),
            reload_debounce_ms: 100,
            auth_destroy_delay_ms: 1000,
            isolate_by_default: false,
        }
    }
}
