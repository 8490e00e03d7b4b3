//! Tab data structure
//!
//! The serializable record the tab strip renders:
//! - Favicon
//! - Title
//! - Home marker (placeholder tabs show an icon and no close button)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TabError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    /// Unique identifier, stable for the session's lifetime
    pub id: String,
    /// Page title, updated from surface events
    pub title: String,
    /// Last requested or committed URL (empty for home tabs)
    pub url: String,
    /// Favicon URL if available
    pub favicon_url: Option<String>,
    /// Placeholder "new tab"; never owns a surface
    pub is_home: bool,
    /// Clear site data when the tab is torn down
    pub isolated: bool,
    /// When the tab was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied by `update_tab`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    /// `Some(None)` clears the favicon
    pub favicon_url: Option<Option<String>>,
}

impl TabPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn favicon(favicon_url: Option<String>) -> Self {
        Self {
            favicon_url: Some(favicon_url),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.favicon_url.is_none()
    }
}

impl Tab {
    /// A mini-app tab that will own a surface
    pub fn new(url: String, title: String) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(TabError::InvalidUrl("URL cannot be empty".to_string()));
        }

        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title,
            url,
            favicon_url: None,
            is_home: false,
            isolated: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// A placeholder tab without a surface
    pub fn home(title: String) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            title,
            url: String::new(),
            favicon_url: None,
            is_home: true,
            isolated: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_isolation(mut self, isolated: bool) -> Self {
        self.isolated = isolated;
        self
    }

    pub fn apply(&mut self, patch: &TabPatch) {
        if patch.is_empty() {
            return;
        }

        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(url) = &patch.url {
            self.url = url.clone();
        }
        if let Some(favicon_url) = &patch.favicon_url {
            self.favicon_url = favicon_url.clone();
        }
        self.updated_at = Utc::now();
    }

    /// Get display title (with fallback to URL)
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}
