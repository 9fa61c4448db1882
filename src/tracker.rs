/// Incremental index of duplicate tabs
///
/// The tracker keeps one [`WindowIndex`] per window, or a single aggregate
/// index when duplicates are searched across all windows. Every mutation
/// updates the affected group in O(1) so tab events never rescan a window.
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::clock::{Clock, SystemClock};
use crate::error::OptionsError;
use crate::matching::{Whitelist, compute_key};
use crate::options::{MatchPolicy, Options, RetentionPolicy};
use crate::retention;
use crate::tab_data::{ObservedTab, TabId, TabRecord, WindowId};
use crate::window_index::{Group, IndexScope, WindowIndex};

/// Where group lookups for a window are routed
#[derive(Debug, Clone)]
enum Layout {
    PerWindow(HashMap<WindowId, WindowIndex>),
    Aggregate(WindowIndex),
}

impl Layout {
    fn per_window() -> Layout {
        Layout::PerWindow(HashMap::new())
    }

    fn aggregate() -> Layout {
        Layout::Aggregate(WindowIndex::new(IndexScope::Aggregate))
    }

    fn get(&self, window: WindowId) -> Option<&WindowIndex> {
        match self {
            Layout::PerWindow(windows) => windows.get(&window),
            Layout::Aggregate(index) => Some(index),
        }
    }

    fn get_mut(&mut self, window: WindowId) -> Option<&mut WindowIndex> {
        match self {
            Layout::PerWindow(windows) => windows.get_mut(&window),
            Layout::Aggregate(index) => Some(index),
        }
    }

    fn get_or_create(&mut self, window: WindowId) -> &mut WindowIndex {
        match self {
            Layout::PerWindow(windows) => windows
                .entry(window)
                .or_insert_with(|| WindowIndex::new(IndexScope::Window(window))),
            Layout::Aggregate(index) => index,
        }
    }
}

fn drop_from_group(layout: &mut Layout, tab: &mut TabRecord) {
    if !tab.is_grouped() {
        return;
    }
    if let Some(index) = layout.get_mut(tab.window_id) {
        index.remove(&tab.group_key, tab.id);
    }
    tab.group_key.clear();
}

fn add_to_group(layout: &mut Layout, tab: &mut TabRecord, key: String) -> Group {
    if key.is_empty() {
        return Group::from([tab.id]);
    }
    let group = layout.get_or_create(tab.window_id).insert(&key, tab.id).clone();
    tab.group_key = key;
    group
}

pub struct Tracker {
    tabs: HashMap<TabId, TabRecord>,
    layout: Layout,
    policy: MatchPolicy,
    whitelist: Whitelist,
    clock: Box<dyn Clock>,
}

impl Tracker {
    pub fn new() -> Tracker {
        Tracker::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Tracker {
        Tracker {
            tabs: HashMap::new(),
            layout: Layout::per_window(),
            policy: MatchPolicy::default(),
            whitelist: Whitelist::default(),
            clock,
        }
    }

    // --------------------------- Configuration ------------------------------

    /// Apply extension options
    ///
    /// Returns `true` when existing groups no longer reflect the options and
    /// the caller must rebuild from the open tab list.
    pub fn configure(&mut self, options: &Options) -> Result<bool, OptionsError> {
        let policy = options.match_policy();
        let whitelist = Whitelist::new(&policy.whitelist)?;
        let mut invalidate = policy != self.policy;
        self.policy = policy;
        self.whitelist = whitelist;

        let aggregate = options.search_in_all_windows;
        if aggregate != self.is_aggregate() {
            log::info!("Switching to {} duplicate search", if aggregate { "global" } else { "per-window" });
            self.layout = if aggregate { Layout::aggregate() } else { Layout::per_window() };
            for tab in self.tabs.values_mut() {
                tab.group_key.clear();
            }
            invalidate = true;
        }

        if invalidate {
            log::debug!("Match options changed, groups need a refresh");
        }
        Ok(invalidate)
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.layout, Layout::Aggregate(_))
    }

    // --------------------------- Accessors ----------------------------------

    /// Index holding the groups of a window, if any tab was grouped there
    pub fn window(&self, window: WindowId) -> Option<&WindowIndex> {
        self.layout.get(window)
    }

    /// Every live index
    pub fn indices(&self) -> Vec<&WindowIndex> {
        match &self.layout {
            Layout::PerWindow(windows) => windows.values().collect(),
            Layout::Aggregate(index) => vec![index],
        }
    }

    /// Number of extraneous tabs in a window
    pub fn closeable_tab_count(&self, window: WindowId) -> usize {
        self.window(window).map_or(0, WindowIndex::closeable_tab_count)
    }

    /// Number of tabs in a window that have at least one duplicate
    pub fn duplicate_count(&self, window: WindowId) -> usize {
        self.window(window).map_or(0, WindowIndex::duplicate_count)
    }

    /// All tabs that have duplicates, including the ones that would be kept
    pub fn duplicate_tabs(&self, window: WindowId) -> Vec<TabId> {
        self.window(window).map(WindowIndex::duplicate_tabs).unwrap_or_default()
    }

    pub fn duplicate_groups(&self, window: WindowId) -> Vec<Group> {
        self.window(window).map(WindowIndex::duplicate_groups).unwrap_or_default()
    }

    pub fn duplicate_groups_with_keys(&self, window: WindowId) -> Vec<(String, Group)> {
        self.window(window)
            .map(WindowIndex::duplicate_groups_with_keys)
            .unwrap_or_default()
    }

    pub fn tab(&self, id: TabId) -> Option<&TabRecord> {
        self.tabs.get(&id)
    }

    /// Stored information for the known tabs among `ids`
    pub fn tabs<'a>(&'a self, ids: impl IntoIterator<Item = &'a TabId>) -> Vec<&'a TabRecord> {
        ids.into_iter().filter_map(|id| self.tabs.get(id)).collect()
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    // --------------------------- Matching -----------------------------------

    fn key_for(&self, tab: &ObservedTab) -> String {
        if self.whitelist.is_match(&tab.url) {
            return String::new();
        }
        compute_key(tab, &self.policy).unwrap_or_else(|e| {
            log::warn!("Not grouping tab {}: {}", tab.id, e);
            String::new()
        })
    }

    // --------------------------- Ignored Tabs -------------------------------

    /// Exclude a tab from grouping, or mark it eligible again
    ///
    /// Un-ignoring does not regroup the tab; the next `update_tab` does.
    /// Returns `false` for unknown tabs.
    pub fn set_ignored(&mut self, id: TabId, ignore: bool) -> bool {
        let Some(tab) = self.tabs.get_mut(&id) else {
            return false;
        };
        tab.suppressed = ignore;
        if ignore {
            drop_from_group(&mut self.layout, tab);
        }
        true
    }

    /// Unknown tabs count as ignored
    pub fn is_ignored(&self, id: TabId) -> bool {
        self.tabs.get(&id).is_none_or(|tab| tab.suppressed)
    }

    // --------------------------- Update Tabs --------------------------------

    /// Update the stored information for a tab and regroup it
    ///
    /// `refresh_timestamp` marks a real navigation rather than a cosmetic
    /// change. Returns the group the tab now belongs to (just the tab itself
    /// when it is not grouped).
    pub fn update_tab(&mut self, observed: &ObservedTab, refresh_timestamp: bool) -> Group {
        let suppressed = self.tabs.get(&observed.id).is_some_and(|tab| tab.suppressed);
        let key = if suppressed { String::new() } else { self.key_for(observed) };
        let now = self.clock.now();

        let tab = match self.tabs.entry(observed.id) {
            Entry::Occupied(entry) => {
                let tab = entry.into_mut();
                if (tab.group_key != key && tab.is_grouped()) || tab.window_id != observed.window_id {
                    drop_from_group(&mut self.layout, tab);
                }
                tab
            }
            Entry::Vacant(entry) => {
                log::debug!("Tracking new tab {}", observed.id);
                entry.insert(TabRecord::new(observed.id, observed.last_accessed.unwrap_or(now)))
            }
        };

        tab.window_id = observed.window_id;
        tab.url.clone_from(&observed.url);
        tab.pinned = observed.pinned;
        if refresh_timestamp {
            tab.last_activity = now;
        }
        add_to_group(&mut self.layout, tab, key)
    }

    /// Drop all stored information about a tab
    ///
    /// `window_closing` names the window being closed with the tab; its whole
    /// index is discarded at once instead of ungrouping tab by tab.
    pub fn remove_tab(&mut self, id: TabId, window_closing: Option<WindowId>) {
        let removed = self.tabs.remove(&id);
        match (&mut self.layout, window_closing) {
            (Layout::PerWindow(windows), Some(window)) => {
                // The window's other records keep stale group keys until their own removals arrive
                if windows.remove(&window).is_some() {
                    log::debug!("Discarded index of closing window {}", window);
                }
            }
            (layout, _) => {
                if let Some(mut tab) = removed {
                    drop_from_group(layout, &mut tab);
                }
            }
        }
    }

    /// Rebuild groups from the authoritative list of open tabs
    ///
    /// With `window` set (and outside aggregate mode) only that window is
    /// rebuilt and `open_tabs` is expected to hold its tabs. Activity
    /// timestamps of tabs that are still open are kept.
    pub fn rebuild(&mut self, window: Option<WindowId>, open_tabs: &[ObservedTab]) {
        let window = if self.is_aggregate() { None } else { window };
        let open: HashSet<TabId> = open_tabs.iter().map(|tab| tab.id).collect();

        match window {
            Some(window) => {
                if let Some(index) = self.layout.get_mut(window) {
                    index.clear();
                }
                self.tabs.retain(|id, tab| tab.window_id != window || open.contains(id));
                for tab in self.tabs.values_mut().filter(|tab| tab.window_id == window) {
                    tab.group_key.clear();
                }
            }
            None => {
                match &mut self.layout {
                    Layout::PerWindow(windows) => windows.clear(),
                    Layout::Aggregate(index) => index.clear(),
                }
                self.tabs.retain(|id, _| open.contains(id));
                for tab in self.tabs.values_mut() {
                    tab.group_key.clear();
                }
            }
        }

        for tab in open_tabs {
            self.update_tab(tab, false);
        }
        log::debug!("Rebuilt groups from {} open tabs", open_tabs.len());
    }

    // --------------------------- Tab rating ---------------------------------

    /// Pick one tab of a group to keep and list the others to close
    pub fn rate_group(&self, group: &Group, policy: &RetentionPolicy) -> Option<(TabId, Vec<TabId>)> {
        retention::rate_group(group, &self.tabs, policy, self.clock.now())
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}
