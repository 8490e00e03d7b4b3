//! Placeholder "new tab" view

use crate::tab::Tab;

pub struct HomeSurface {
    title: String,
}

impl HomeSurface {
    pub const DEFAULT_TITLE: &'static str = "New Tab";

    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// A fresh home tab
    pub fn tab(&self) -> Tab {
        Tab::home(self.title.clone())
    }
}

impl Default for HomeSurface {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TITLE)
    }
}
