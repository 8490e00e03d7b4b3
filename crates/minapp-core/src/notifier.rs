//! User-facing notifications
//!
//! Only user-initiated operations (new tab, open app, reload, clear site data)
//! report failures here. Lifecycle-internal failures are logged and contained.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotificationLevel, message: &str);
}

/// Writes notifications to the log; used when the host installs none
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Info => tracing::info!(message = %message, "Notification"),
            NotificationLevel::Error => tracing::error!(message = %message, "Notification"),
        }
    }
}
