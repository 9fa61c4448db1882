/// Deduplication key computation
///
/// Two tabs are duplicates when they produce the same key under the active
/// [`MatchPolicy`]. Keys are plain strings so they can be shown in debug
/// listings as-is.
use regex::RegexSet;
use url::Url;

use crate::error::{KeyError, OptionsError};
use crate::options::{Granularity, KeySource, MatchPolicy};
use crate::tab_data::ObservedTab;

/// Compute the deduplication key for a tab
///
/// Algorithm (URL source):
/// 1. Parse the URL
/// 2. Strip the fragment (`search`), then the query (`path`)
/// 3. Rewrite `http` to `https` if `ignore_http`
/// 4. Strip a leading `www.` if `ignore_www`
/// 5. Keep only the origin at `origin` granularity
///
/// Then, for both sources, lowercase if `case_insensitive` and prefix
/// `{container}` if `container`.
///
/// Examples (default policy plus `search` granularity):
/// - http://Example.com/a → https://example.com/a
/// - https://example.com/a#x → https://example.com/a
pub fn compute_key(tab: &ObservedTab, policy: &MatchPolicy) -> Result<String, KeyError> {
    let mut key = match policy.source {
        KeySource::Url => match_url(&tab.url, policy)?,
        KeySource::Title => tab.title.clone(),
    };
    if policy.case_insensitive {
        key = key.to_lowercase();
    }
    if policy.container {
        key = format!("{{{}}}{}", tab.cookie_store_id.as_deref().unwrap_or_default(), key);
    }
    Ok(key)
}

fn match_url(raw: &str, policy: &MatchPolicy) -> Result<String, KeyError> {
    let mut url = Url::parse(raw).map_err(|e| KeyError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if policy.granularity >= Granularity::Search {
        url.set_fragment(None);
    }
    if policy.granularity >= Granularity::Path {
        url.set_query(None);
    }

    // http and https are both special schemes, so the switch cannot fail
    if policy.ignore_http && url.scheme() == "http" {
        let _ = url.set_scheme("https");
    }

    if policy.ignore_www {
        let stripped = url
            .host_str()
            .and_then(|host| host.strip_prefix("www."))
            .filter(|rest| !rest.is_empty())
            .map(str::to_string);
        if let Some(host) = stripped {
            if let Err(e) = url.set_host(Some(&host)) {
                log::debug!("Keeping www. prefix on {}: {}", raw, e);
            }
        }
    }

    if policy.granularity == Granularity::Origin {
        let origin = url.origin();
        // Opaque origins (about:, data:) all serialize to "null"
        if origin.is_tuple() {
            return Ok(origin.ascii_serialization());
        }
    }

    Ok(url.to_string())
}

/// Check whether a URL is an empty new-tab page
pub fn is_blank_url(url: &str) -> bool {
    matches!(
        url.trim(),
        "" | "about:blank" | "about:newtab" | "about:home" | "chrome://newtab/" | "edge://newtab/"
    )
}

/// Compiled set of URL patterns that are never grouped
#[derive(Debug, Clone)]
pub struct Whitelist {
    patterns: RegexSet,
}

impl Whitelist {
    /// Compile `*`-wildcard patterns, each matched against the whole URL
    pub fn new(patterns: &[String]) -> Result<Whitelist, OptionsError> {
        let regexes = patterns.iter().map(|pattern| {
            let body: Vec<String> = pattern.split('*').map(regex::escape).collect();
            format!("^{}$", body.join(".*"))
        });
        let patterns =
            RegexSet::new(regexes).map_err(|e| OptionsError::InvalidWhitelist(e.to_string()))?;
        Ok(Whitelist { patterns })
    }

    pub fn is_match(&self, url: &str) -> bool {
        self.patterns.is_match(url)
    }
}

impl Default for Whitelist {
    fn default() -> Self {
        Whitelist {
            patterns: RegexSet::empty(),
        }
    }
}
