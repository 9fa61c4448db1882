/// Event dispatch between the browser and the tracker
///
/// The service owns the tracker and turns tab lifecycle events into tracker
/// updates, closing duplicates when auto-close is enabled. Tracker borrows
/// never span an `.await`, so each tracker operation finishes before another
/// event can be handled.
use std::cell::{Ref, RefCell};

use futures::future::join_all;

use crate::error::{HostError, OptionsError};
use crate::host::TabHost;
use crate::matching::is_blank_url;
use crate::options::Options;
use crate::tab_data::{ObservedTab, TabChange, TabId, TabStatus, WindowId};
use crate::tracker::Tracker;
use crate::window_index::Group;

/// Keyboard command that resolves every duplicate group
pub const CLOSE_DUPLICATES_COMMAND: &str = "close-duplicate-tabs";

/// Tab lifecycle notifications from the browser
#[derive(Debug, Clone, PartialEq)]
pub enum TabEvent {
    Created(ObservedTab),
    /// Only navigations refresh the tab's activity timestamp
    Updated { tab: ObservedTab, change: TabChange },
    Removed {
        tab_id: TabId,
        window_id: WindowId,
        is_window_closing: bool,
    },
    /// A tab was moved into another window
    Attached(TabId),
    Command(String),
}

/// Windows whose duplicate counts may have changed
#[derive(Debug, Clone, PartialEq)]
pub enum Affected {
    Window(WindowId),
    All,
}

/// What happens to the tab kept after a group is resolved
#[derive(Debug, Clone, Copy, PartialEq)]
struct KeptTab {
    tab_id: TabId,
    observed_tab_closed: bool,
    tab_index: Option<u32>,
    active: bool,
}

fn tolerate(action: &str, id: TabId, result: Result<(), HostError>) {
    if let Err(e) = result {
        log::debug!("Ignoring failed {} of tab {}: {}", action, id, e);
    }
}

pub struct DuplicateService<H: TabHost> {
    host: H,
    tracker: RefCell<Tracker>,
    options: RefCell<Options>,
}

impl<H: TabHost> DuplicateService<H> {
    pub fn new(host: H) -> Self {
        Self::with_tracker(host, Tracker::new())
    }

    pub fn with_tracker(host: H, tracker: Tracker) -> Self {
        DuplicateService {
            host,
            tracker: RefCell::new(tracker),
            options: RefCell::new(Options::default()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn tracker(&self) -> Ref<'_, Tracker> {
        self.tracker.borrow()
    }

    pub fn options(&self) -> Options {
        self.options.borrow().clone()
    }

    fn auto_close(&self) -> bool {
        self.options.borrow().auto_close_tab
    }

    // --------------------------- Configuration ------------------------------

    /// Apply new options, rebuilding every group if matching changed
    ///
    /// Returns whether a refresh was performed.
    pub async fn apply_options(&self, options: Options) -> Result<bool, OptionsError> {
        let invalidate = self.tracker.borrow_mut().configure(&options)?;
        *self.options.borrow_mut() = options;
        if invalidate {
            if let Err(e) = self.refresh(None).await {
                log::warn!("Refresh after options change failed: {}", e);
            }
        }
        Ok(invalidate)
    }

    /// Re-read open tabs from the browser and rebuild groups
    pub async fn refresh(&self, window: Option<WindowId>) -> Result<(), HostError> {
        let window = if self.tracker.borrow().is_aggregate() { None } else { window };
        let tabs = self.host.get_tabs(window).await?;
        self.tracker.borrow_mut().rebuild(window, &tabs);
        Ok(())
    }

    // --------------------------- Events -------------------------------------

    /// Handle one browser event and report where counts may have changed
    pub async fn handle(&self, event: TabEvent) -> Affected {
        let affected = match event {
            TabEvent::Created(tab) => {
                let window = tab.window_id;
                self.on_tab_seen(tab, true, true).await;
                Affected::Window(window)
            }
            TabEvent::Updated { tab, change } => {
                let window = tab.window_id;
                self.on_tab_seen(tab, false, change.is_navigation()).await;
                Affected::Window(window)
            }
            TabEvent::Removed { tab_id, window_id, is_window_closing } => {
                self.tracker
                    .borrow_mut()
                    .remove_tab(tab_id, is_window_closing.then_some(window_id));
                Affected::Window(window_id)
            }
            TabEvent::Attached(tab_id) => match self.fetch_tracked(tab_id).await {
                Ok(Some(tab)) => {
                    let window = tab.window_id;
                    self.on_tab_seen(tab, true, true).await;
                    Affected::Window(window)
                }
                Ok(None) => Affected::All,
                Err(e) => {
                    log::debug!("Attached tab {} vanished: {}", tab_id, e);
                    Affected::All
                }
            },
            TabEvent::Command(name) => {
                if name == CLOSE_DUPLICATES_COMMAND {
                    let closed = self.close_duplicate_tabs(None).await;
                    log::info!("Closed {} duplicate tabs", closed);
                } else {
                    log::debug!("Unknown command {:?}", name);
                }
                Affected::All
            }
        };

        if self.tracker.borrow().is_aggregate() { Affected::All } else { affected }
    }

    /// Windows to redraw for an [`Affected`] value
    pub async fn affected_windows(&self, affected: &Affected) -> Vec<WindowId> {
        match affected {
            Affected::Window(window) => vec![*window],
            Affected::All => self.host.get_windows().await.unwrap_or_else(|e| {
                log::debug!("Could not list windows: {}", e);
                Vec::new()
            }),
        }
    }

    async fn on_tab_seen(&self, tab: ObservedTab, require_complete: bool, refresh_timestamp: bool) {
        let group = self.tracker.borrow_mut().update_tab(&tab, refresh_timestamp);
        if group.len() < 2 || !self.auto_close() || is_blank_url(&tab.url) {
            return;
        }
        if require_complete && tab.status != TabStatus::Complete {
            return;
        }
        self.close_duplicate_group(&group, Some(&tab)).await;
    }

    /// Fetch a tab from the browser unless its removal was handled meanwhile
    ///
    /// A tab the tracker knew before the fetch but not after it was removed
    /// while the request was pending; updating it would bring the record back
    /// with no removal event left to clear it.
    async fn fetch_tracked(&self, id: TabId) -> Result<Option<ObservedTab>, HostError> {
        let known = self.tracker.borrow().tab(id).is_some();
        let tab = self.host.get_tab(id).await?;
        if known && self.tracker.borrow().tab(id).is_none() {
            log::debug!("Tab {} was removed while being fetched", id);
            return Ok(None);
        }
        Ok(Some(tab))
    }

    async fn update_from_host(&self, id: TabId) {
        match self.fetch_tracked(id).await {
            Ok(Some(tab)) => {
                self.tracker.borrow_mut().update_tab(&tab, false);
            }
            Ok(None) => {}
            Err(e) => log::debug!("Tab {} vanished before update: {}", id, e),
        }
    }

    // --------------------------- Closing ------------------------------------

    /// Close all but one tab of a group
    ///
    /// `observed` is the tab whose event formed the group, if any. Returns the
    /// ids a close was requested for.
    pub async fn close_duplicate_group(&self, group: &Group, observed: Option<&ObservedTab>) -> Vec<TabId> {
        let policy = self.options.borrow().retention_policy();
        let Some((retain, close)) = self.tracker.borrow().rate_group(group, &policy) else {
            return Vec::new();
        };
        if close.is_empty() {
            return close;
        }

        log::debug!("Keeping tab {}, closing {:?}", retain, close);
        let results = join_all(close.iter().map(|&id| self.host.remove_tab(id))).await;
        for (&id, result) in close.iter().zip(results) {
            tolerate("close", id, result);
        }

        self.handle_remaining_tab(KeptTab {
            tab_id: retain,
            observed_tab_closed: observed.is_some_and(|tab| tab.id != retain),
            tab_index: observed.map(|tab| tab.index),
            active: observed.is_some_and(|tab| tab.active),
        })
        .await;
        close
    }

    async fn handle_remaining_tab(&self, kept: KeptTab) {
        let (default_behavior, activate_kept, reload) = {
            let options = self.options.borrow();
            (options.default_tab_behavior, options.activate_kept_tab, options.keep_reload_older_tab)
        };
        let id = kept.tab_id;

        if default_behavior && kept.observed_tab_closed {
            if let Some(index) = kept.tab_index {
                tolerate("move", id, self.host.move_tab(id, index).await);
            }
            if kept.active {
                tolerate("activation", id, self.host.activate_tab(id).await);
            }
        } else if activate_kept {
            tolerate("activation", id, self.host.activate_tab(id).await);
        }

        if reload {
            self.tracker.borrow_mut().set_ignored(id, true);
            tolerate("reload", id, self.host.reload_tab(id).await);
            self.tracker.borrow_mut().set_ignored(id, false);
            self.update_from_host(id).await;
        }
    }

    /// Resolve every duplicate group of a window, or of all windows
    ///
    /// Returns the number of tabs a close was requested for.
    pub async fn close_duplicate_tabs(&self, window: Option<WindowId>) -> usize {
        let groups: Vec<Group> = {
            let tracker = self.tracker.borrow();
            match window {
                Some(window) => tracker.duplicate_groups(window),
                None => tracker
                    .indices()
                    .into_iter()
                    .flat_map(|index| index.duplicate_groups())
                    .collect(),
            }
        };

        let mut closed = 0;
        for group in groups {
            closed += self.close_duplicate_group(&group, None).await.len();
        }
        closed
    }

    // --------------------------- Listing ------------------------------------

    /// Browser tab objects for every duplicate group, keyed by group key
    pub async fn fetch_duplicate_group_tabs(&self, window: WindowId) -> Vec<(String, Vec<ObservedTab>)> {
        let groups = self.tracker.borrow().duplicate_groups_with_keys(window);
        let mut listing = Vec::with_capacity(groups.len());
        for (key, group) in groups {
            let tabs = join_all(group.iter().map(|&id| self.host.get_tab(id))).await;
            listing.push((key, tabs.into_iter().filter_map(Result::ok).collect()));
        }
        listing
    }
}
