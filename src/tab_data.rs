/// Data structures for tracked tabs
use serde::{Deserialize, Serialize};

pub type TabId = i32;
pub type WindowId = i32;

/// Loading state reported by the browser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    #[default]
    Complete,
    Unloaded,
}

/// A tab as reported by the browser (`tabs.Tab`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedTab {
    pub id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cookie_store_id: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub status: TabStatus,
    /// Only reported by Firefox
    #[serde(default)]
    pub last_accessed: Option<f64>,
}

impl ObservedTab {
    pub fn new(id: TabId, window_id: WindowId, url: &str) -> ObservedTab {
        ObservedTab {
            id,
            window_id,
            url: url.to_string(),
            title: String::new(),
            cookie_store_id: None,
            pinned: false,
            active: false,
            index: 0,
            status: TabStatus::Complete,
            last_accessed: None,
        }
    }
}

/// Properties that changed in a `tabs.onUpdated` notification (`changeInfo`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabChange {
    pub url: Option<String>,
    pub status: Option<TabStatus>,
    pub title: Option<String>,
    pub pinned: Option<bool>,
}

impl TabChange {
    /// A load or a new address, as opposed to a title or favicon change
    pub fn is_navigation(&self) -> bool {
        self.url.is_some() || self.status.is_some()
    }
}

/// Stored information about a tracked tab
#[derive(Debug, Clone, PartialEq)]
pub struct TabRecord {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: String,
    pub pinned: bool,
    /// Milliseconds since the epoch
    pub last_activity: f64,
    /// Excluded from grouping, e.g. while the tab is being reloaded
    pub suppressed: bool,
    /// Key of the group holding this tab; empty when not grouped
    pub group_key: String,
}

impl TabRecord {
    pub fn new(id: TabId, last_activity: f64) -> TabRecord {
        TabRecord {
            id,
            window_id: -2,
            url: String::new(),
            pinned: false,
            last_activity,
            suppressed: false,
            group_key: String::new(),
        }
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_key.is_empty()
    }
}
