/// Browser tab API consumed by the duplicate service
use crate::error::HostError;
use crate::tab_data::{ObservedTab, TabId, WindowId};

/// Requests the service makes to the browser
///
/// Implemented over `chrome.tabs` in the extension and by in-memory fakes
/// in tests. Requests against tabs that disappeared in the meantime fail
/// with [`HostError::TabNotFound`].
#[allow(async_fn_in_trait)]
pub trait TabHost {
    async fn get_tab(&self, id: TabId) -> Result<ObservedTab, HostError>;

    /// Open tabs of normal windows, optionally limited to one window
    async fn get_tabs(&self, window: Option<WindowId>) -> Result<Vec<ObservedTab>, HostError>;

    async fn remove_tab(&self, id: TabId) -> Result<(), HostError>;

    async fn move_tab(&self, id: TabId, index: u32) -> Result<(), HostError>;

    async fn activate_tab(&self, id: TabId) -> Result<(), HostError>;

    async fn reload_tab(&self, id: TabId) -> Result<(), HostError>;

    async fn get_windows(&self) -> Result<Vec<WindowId>, HostError>;
}
