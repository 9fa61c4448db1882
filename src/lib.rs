/// Tab Dedup - duplicate tab tracking for browser extensions
/// Built with Rust + WASM

pub mod clock;
pub mod error;
pub mod host;
pub mod matching;
pub mod options;
pub mod retention;
pub mod service;
pub mod tab_data;
pub mod tracker;
pub mod window_index;

#[cfg(target_arch = "wasm32")]
pub mod background;

use wasm_bindgen::prelude::*;

pub use options::{MatchPolicy, Options, RetentionPolicy};
pub use service::{DuplicateService, TabEvent};
pub use tab_data::{ObservedTab, TabChange, TabId, TabRecord, WindowId};
pub use tracker::Tracker;
pub use window_index::{Group, WindowIndex};

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Expose key computation for the options page preview
#[wasm_bindgen]
pub fn normalize_url(url: &str) -> String {
    let tab = ObservedTab::new(0, 0, url);
    matching::compute_key(&tab, &MatchPolicy::default()).unwrap_or_else(|_| "invalid".to_string())
}
