/// Extension options and the policies derived from them
use serde::{Deserialize, Serialize};

use crate::error::OptionsError;
use crate::tab_data::TabId;

/// Flat settings object as stored by the options page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    pub auto_close_tab: bool,
    pub default_tab_behavior: bool,
    pub activate_kept_tab: bool,
    pub keep_newer_tab: bool,
    pub keep_reload_older_tab: bool,
    pub keep_tab_with_https: bool,
    pub keep_pinned_tab: bool,
    pub ignore_hash_part: bool,
    pub ignore_search_part: bool,
    pub ignore_path_part: bool,
    pub compare_with_title: bool,
    #[serde(rename = "ignore3w")]
    pub ignore_www: bool,
    pub case_insensitive: bool,
    pub search_in_all_windows: bool,
    pub search_per_container: bool,
    pub white_list: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            auto_close_tab: true,
            default_tab_behavior: false,
            activate_kept_tab: true,
            keep_newer_tab: false,
            keep_reload_older_tab: false,
            keep_tab_with_https: true,
            keep_pinned_tab: true,
            ignore_hash_part: false,
            ignore_search_part: false,
            ignore_path_part: false,
            compare_with_title: false,
            ignore_www: false,
            case_insensitive: true,
            search_in_all_windows: false,
            search_per_container: false,
            white_list: String::new(),
        }
    }
}

impl Options {
    pub fn from_json(json: &str) -> Result<Options, OptionsError> {
        serde_json::from_str(json).map_err(|e| OptionsError::Decode(e.to_string()))
    }

    pub fn match_policy(&self) -> MatchPolicy {
        let granularity = if self.ignore_path_part {
            Granularity::Origin
        } else if self.ignore_search_part {
            Granularity::Path
        } else if self.ignore_hash_part {
            Granularity::Search
        } else {
            Granularity::Fragment
        };

        MatchPolicy {
            source: if self.compare_with_title { KeySource::Title } else { KeySource::Url },
            granularity,
            ignore_http: self.keep_tab_with_https,
            ignore_www: self.ignore_www,
            case_insensitive: self.case_insensitive,
            container: self.search_per_container,
            whitelist: whitelist_patterns(&self.white_list),
        }
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            prefer_age: if self.keep_newer_tab { AgePreference::Newest } else { AgePreference::Oldest },
            prefer_pinned: self.keep_pinned_tab,
            prefer_https: self.keep_tab_with_https,
            active: None,
        }
    }
}

fn whitelist_patterns(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Tab field the deduplication key is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    Url,
    Title,
}

/// How much of the URL takes part in the key, from most to least
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Fragment,
    Search,
    Path,
    Origin,
}

/// How a tab is turned into a deduplication key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPolicy {
    pub source: KeySource,
    pub granularity: Granularity,
    /// Treat `http` as `https`
    pub ignore_http: bool,
    /// Strip a leading `www.` host label
    pub ignore_www: bool,
    pub case_insensitive: bool,
    /// Prefix the key with the container (cookie store) id
    pub container: bool,
    /// URL patterns with `*` wildcards that are never grouped
    pub whitelist: Vec<String>,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Options::default().match_policy()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgePreference {
    Newest,
    Oldest,
}

/// Which tab of a duplicate group survives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub prefer_age: AgePreference,
    pub prefer_pinned: bool,
    pub prefer_https: bool,
    /// Tab currently holding focus
    pub active: Option<TabId>,
}
