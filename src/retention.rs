/// Choosing which tab of a duplicate group to keep
use std::collections::HashMap;

use crate::options::{AgePreference, RetentionPolicy};
use crate::tab_data::{TabId, TabRecord};
use crate::window_index::Group;

/// Score a tab for retention; the highest score is kept
///
/// The bonuses are multiples of `now` so that focus beats pinning, pinning
/// beats a secure scheme and a secure scheme beats any age difference.
pub fn score(tab: &TabRecord, policy: &RetentionPolicy, now: f64) -> f64 {
    let mut score = match policy.prefer_age {
        AgePreference::Newest => tab.last_activity,
        AgePreference::Oldest => -tab.last_activity,
    };
    if policy.active == Some(tab.id) {
        score += 3.0 * now;
    }
    if policy.prefer_pinned && tab.pinned {
        score += 2.0 * now;
    }
    if policy.prefer_https && tab.url.starts_with("https:") {
        score += now;
    }
    score
}

/// Pick the tab to keep and the tabs to close
///
/// Members are scanned in ascending id order and only a strictly higher
/// score replaces the current best, so ties go to the lowest id. Members
/// missing from `tabs` are never kept. Returns `None` for an empty group.
pub fn rate_group(
    group: &Group,
    tabs: &HashMap<TabId, TabRecord>,
    policy: &RetentionPolicy,
    now: f64,
) -> Option<(TabId, Vec<TabId>)> {
    let first = *group.first()?;
    if group.len() == 1 {
        return Some((first, Vec::new()));
    }

    let mut best: Option<(TabId, f64)> = None;
    for tab in group.iter().filter_map(|id| tabs.get(id)) {
        let score = score(tab, policy, now);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((tab.id, score));
        }
    }

    let retain = best.map_or(first, |(id, _)| id);
    let close = group.iter().copied().filter(|&id| id != retain).collect();
    Some((retain, close))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000_000.0;

    fn record(id: TabId, last_activity: f64, url: &str, pinned: bool) -> TabRecord {
        TabRecord {
            url: url.to_string(),
            pinned,
            ..TabRecord::new(id, last_activity)
        }
    }

    fn policy(prefer_age: AgePreference) -> RetentionPolicy {
        RetentionPolicy {
            prefer_age,
            prefer_pinned: false,
            prefer_https: false,
            active: None,
        }
    }

    fn table(records: Vec<TabRecord>) -> (Group, HashMap<TabId, TabRecord>) {
        let group = records.iter().map(|r| r.id).collect();
        let tabs = records.into_iter().map(|r| (r.id, r)).collect();
        (group, tabs)
    }

    #[test]
    fn test_singleton_group_is_noop() {
        let (group, tabs) = table(vec![record(5, 100.0, "https://a/", false)]);

        assert_eq!(rate_group(&group, &tabs, &policy(AgePreference::Oldest), NOW), Some((5, vec![])));
    }

    #[test]
    fn test_empty_group() {
        let tabs = HashMap::new();

        assert_eq!(rate_group(&Group::new(), &tabs, &policy(AgePreference::Oldest), NOW), None);
    }

    #[test]
    fn test_prefer_oldest() {
        let (group, tabs) = table(vec![
            record(1, 200.0, "https://a/", false),
            record(2, 100.0, "https://a/", false),
        ]);

        assert_eq!(
            rate_group(&group, &tabs, &policy(AgePreference::Oldest), NOW),
            Some((2, vec![1]))
        );
    }

    #[test]
    fn test_prefer_newest() {
        let (group, tabs) = table(vec![
            record(1, 200.0, "https://a/", false),
            record(2, 100.0, "https://a/", false),
        ]);

        assert_eq!(
            rate_group(&group, &tabs, &policy(AgePreference::Newest), NOW),
            Some((1, vec![2]))
        );
    }

    #[test]
    fn test_focus_beats_age() {
        let (group, tabs) = table(vec![
            record(1, 100.0, "https://a/", false),
            record(2, 200.0, "https://a/", false),
        ]);
        let policy = RetentionPolicy {
            active: Some(2),
            ..policy(AgePreference::Oldest)
        };

        assert_eq!(rate_group(&group, &tabs, &policy, NOW), Some((2, vec![1])));
    }

    #[test]
    fn test_focus_beats_pinned_beats_https() {
        let (group, tabs) = table(vec![
            record(1, 100.0, "https://a/", false),
            record(2, 200.0, "http://a/", true),
            record(3, 300.0, "http://a/", false),
        ]);
        let mut policy = RetentionPolicy {
            prefer_age: AgePreference::Oldest,
            prefer_pinned: true,
            prefer_https: true,
            active: None,
        };

        assert_eq!(rate_group(&group, &tabs, &policy, NOW).map(|r| r.0), Some(2));

        policy.active = Some(3);
        assert_eq!(rate_group(&group, &tabs, &policy, NOW).map(|r| r.0), Some(3));

        policy.active = None;
        policy.prefer_pinned = false;
        assert_eq!(rate_group(&group, &tabs, &policy, NOW).map(|r| r.0), Some(1));
    }

    #[test]
    fn test_ties_go_to_lowest_id() {
        let (group, tabs) = table(vec![
            record(9, 100.0, "https://a/", false),
            record(4, 100.0, "https://a/", false),
            record(7, 100.0, "https://a/", false),
        ]);

        assert_eq!(
            rate_group(&group, &tabs, &policy(AgePreference::Newest), NOW),
            Some((4, vec![7, 9]))
        );
    }

    #[test]
    fn test_unknown_members_are_closed() {
        let (mut group, tabs) = table(vec![record(3, 100.0, "https://a/", false)]);
        group.insert(1);

        assert_eq!(
            rate_group(&group, &tabs, &policy(AgePreference::Oldest), NOW),
            Some((3, vec![1]))
        );
    }
}
