/// Error types for the duplicate tab tracker
use std::fmt;

use crate::tab_data::TabId;

// === KeyError ===

/// Errors raised while computing the deduplication key of a tab.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyError {
    /// The tab URL could not be parsed.
    InvalidUrl { url: String, reason: String },
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::InvalidUrl { url, reason } => {
                write!(f, "Invalid tab URL {:?}: {}", url, reason)
            }
        }
    }
}

impl std::error::Error for KeyError {}

// === HostError ===

/// Errors reported by the browser host when a tab request fails.
///
/// These are expected races (a tab closed before the request completed) and
/// are never retried.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// The tab no longer exists.
    TabNotFound(TabId),
    /// The host API rejected the request.
    Rejected(String),
    /// The host returned a value that could not be decoded.
    Decode(String),
}

impl HostError {
    /// Convert a rejected JS promise value into a host error.
    pub fn from_js(value: &wasm_bindgen::JsValue) -> HostError {
        HostError::Rejected(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::TabNotFound(id) => write!(f, "Tab not found: {}", id),
            HostError::Rejected(msg) => write!(f, "Host request rejected: {}", msg),
            HostError::Decode(msg) => write!(f, "Failed to decode host value: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

// === OptionsError ===

/// Errors raised while decoding or applying extension options.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsError {
    /// The options object could not be decoded.
    Decode(String),
    /// A whitelist pattern could not be compiled.
    InvalidWhitelist(String),
}

impl fmt::Display for OptionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionsError::Decode(msg) => write!(f, "Failed to decode options: {}", msg),
            OptionsError::InvalidWhitelist(msg) => write!(f, "Invalid whitelist: {}", msg),
        }
    }
}

impl std::error::Error for OptionsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = KeyError::InvalidUrl {
            url: "::".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid tab URL \"::\": relative URL without a base");
        assert_eq!(HostError::TabNotFound(7).to_string(), "Tab not found: 7");
        assert_eq!(
            OptionsError::Decode("bad".to_string()).to_string(),
            "Failed to decode options: bad"
        );
    }
}
