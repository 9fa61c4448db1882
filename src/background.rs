/// Background page bindings: `chrome.tabs` host and the exported service
use std::rc::Rc;

use js_sys::Promise;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::error::HostError;
use crate::host::TabHost;
use crate::options::Options;
use crate::service::{DuplicateService, TabEvent};
use crate::tab_data::{ObservedTab, TabId, WindowId};

// Import JS bridge functions
#[wasm_bindgen(module = "/js/host.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getTab(id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getTabs(window_id: Option<i32>) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTab(id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn moveTab(id: i32, index: u32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn activateTab(id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn reloadTab(id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getWindows() -> Result<JsValue, JsValue>;
}

fn decode<T: DeserializeOwned>(value: JsValue) -> Result<T, HostError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| HostError::Decode(e.to_string()))
}

fn to_js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

/// Host backed by the WebExtension tabs API
pub struct JsHost;

impl TabHost for JsHost {
    async fn get_tab(&self, id: TabId) -> Result<ObservedTab, HostError> {
        let value = getTab(id).await.map_err(|e| HostError::from_js(&e))?;
        if value.is_undefined() || value.is_null() {
            return Err(HostError::TabNotFound(id));
        }
        decode(value)
    }

    async fn get_tabs(&self, window: Option<WindowId>) -> Result<Vec<ObservedTab>, HostError> {
        decode(getTabs(window).await.map_err(|e| HostError::from_js(&e))?)
    }

    async fn remove_tab(&self, id: TabId) -> Result<(), HostError> {
        removeTab(id).await.map_err(|e| HostError::from_js(&e))
    }

    async fn move_tab(&self, id: TabId, index: u32) -> Result<(), HostError> {
        moveTab(id, index).await.map_err(|e| HostError::from_js(&e))
    }

    async fn activate_tab(&self, id: TabId) -> Result<(), HostError> {
        activateTab(id).await.map_err(|e| HostError::from_js(&e))
    }

    async fn reload_tab(&self, id: TabId) -> Result<(), HostError> {
        reloadTab(id).await.map_err(|e| HostError::from_js(&e))
    }

    async fn get_windows(&self) -> Result<Vec<WindowId>, HostError> {
        decode(getWindows().await.map_err(|e| HostError::from_js(&e))?)
    }
}

/// Duplicate tab service exposed to the background script
///
/// Every event method returns a promise resolving to the ids of the
/// windows whose badge should be redrawn.
#[wasm_bindgen]
pub struct Background {
    service: Rc<DuplicateService<JsHost>>,
}

#[wasm_bindgen]
impl Background {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Background {
        Background {
            service: Rc::new(DuplicateService::new(JsHost)),
        }
    }

    fn dispatch(&self, event: TabEvent) -> Promise {
        let service = Rc::clone(&self.service);
        future_to_promise(async move {
            let affected = service.handle(event).await;
            let windows = service.affected_windows(&affected).await;
            serde_wasm_bindgen::to_value(&windows).map_err(to_js_error)
        })
    }

    #[wasm_bindgen(js_name = onCreated)]
    pub fn on_created(&self, tab: JsValue) -> Result<Promise, JsValue> {
        let tab = decode(tab).map_err(to_js_error)?;
        Ok(self.dispatch(TabEvent::Created(tab)))
    }

    /// `change` is the listener's `changeInfo` object
    #[wasm_bindgen(js_name = onUpdated)]
    pub fn on_updated(&self, change: JsValue, tab: JsValue) -> Result<Promise, JsValue> {
        let change = decode(change).map_err(to_js_error)?;
        let tab = decode(tab).map_err(to_js_error)?;
        Ok(self.dispatch(TabEvent::Updated { tab, change }))
    }

    #[wasm_bindgen(js_name = onRemoved)]
    pub fn on_removed(&self, tab_id: i32, window_id: i32, is_window_closing: bool) -> Promise {
        self.dispatch(TabEvent::Removed {
            tab_id,
            window_id,
            is_window_closing,
        })
    }

    #[wasm_bindgen(js_name = onAttached)]
    pub fn on_attached(&self, tab_id: i32) -> Promise {
        self.dispatch(TabEvent::Attached(tab_id))
    }

    #[wasm_bindgen(js_name = onCommand)]
    pub fn on_command(&self, name: String) -> Promise {
        self.dispatch(TabEvent::Command(name))
    }

    /// Apply the stored options object; resolves to whether groups were rebuilt
    #[wasm_bindgen(js_name = setOptions)]
    pub fn set_options(&self, options: JsValue) -> Result<Promise, JsValue> {
        let options: Options = serde_wasm_bindgen::from_value(options).map_err(to_js_error)?;
        let service = Rc::clone(&self.service);
        Ok(future_to_promise(async move {
            let refreshed = service.apply_options(options).await.map_err(to_js_error)?;
            Ok(JsValue::from_bool(refreshed))
        }))
    }

    pub fn refresh(&self, window_id: Option<i32>) -> Promise {
        let service = Rc::clone(&self.service);
        future_to_promise(async move {
            service.refresh(window_id).await.map_err(to_js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = closeDuplicateTabs)]
    pub fn close_duplicate_tabs(&self, window_id: Option<i32>) -> Promise {
        let service = Rc::clone(&self.service);
        future_to_promise(async move {
            let closed = service.close_duplicate_tabs(window_id).await;
            Ok(JsValue::from_f64(closed as f64))
        })
    }

    #[wasm_bindgen(js_name = closeableTabCount)]
    pub fn closeable_tab_count(&self, window_id: i32) -> u32 {
        self.service.tracker().closeable_tab_count(window_id) as u32
    }

    #[wasm_bindgen(js_name = duplicateTabs)]
    pub fn duplicate_tabs(&self, window_id: i32) -> Vec<i32> {
        self.service.tracker().duplicate_tabs(window_id)
    }

    #[wasm_bindgen(js_name = isIgnoredTab)]
    pub fn is_ignored_tab(&self, tab_id: i32) -> bool {
        self.service.tracker().is_ignored(tab_id)
    }

    /// Duplicate groups with their browser tab objects, for debugging
    #[wasm_bindgen(js_name = fetchDuplicateGroupTabs)]
    pub fn fetch_duplicate_group_tabs(&self, window_id: i32) -> Promise {
        let service = Rc::clone(&self.service);
        future_to_promise(async move {
            let listing = service.fetch_duplicate_group_tabs(window_id).await;
            serde_wasm_bindgen::to_value(&listing).map_err(to_js_error)
        })
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::new()
    }
}
