/// Per-window duplicate groups with incremental bookkeeping
use std::collections::{BTreeSet, HashMap};

use crate::tab_data::{TabId, WindowId};

/// Set of tabs sharing a deduplication key
pub type Group = BTreeSet<TabId>;

/// What an index covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexScope {
    Window(WindowId),
    /// Every open tab, when searching in all windows
    Aggregate,
}

/// Duplicate groups of one window (or of every window in aggregate mode)
///
/// `duplicate_count` is the number of tabs in groups of two or more, so a
/// pair forming adds 2 and a pair breaking up removes 2.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowIndex {
    scope: IndexScope,
    groups: HashMap<String, Group>,
    duplicate_count: usize,
    duplicate_groups: usize,
}

impl WindowIndex {
    pub fn new(scope: IndexScope) -> WindowIndex {
        WindowIndex {
            scope,
            groups: HashMap::new(),
            duplicate_count: 0,
            duplicate_groups: 0,
        }
    }

    pub fn scope(&self) -> IndexScope {
        self.scope
    }

    /// Tabs belonging to a group with at least one other member
    pub fn duplicate_count(&self) -> usize {
        self.duplicate_count
    }

    /// Tabs that would be closed if every group were resolved
    pub fn closeable_tab_count(&self) -> usize {
        self.duplicate_count - self.duplicate_groups
    }

    pub fn group(&self, key: &str) -> Option<&Group> {
        self.groups.get(key)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &Group)> {
        self.groups.iter().map(|(key, group)| (key.as_str(), group))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.duplicate_count = 0;
        self.duplicate_groups = 0;
    }

    /// Add a tab to the group for `key`, creating the group if needed
    pub fn insert(&mut self, key: &str, id: TabId) -> &Group {
        let group = self.groups.entry(key.to_string()).or_default();
        if group.insert(id) {
            match group.len() {
                2 => {
                    self.duplicate_count += 2;
                    self.duplicate_groups += 1;
                }
                n if n > 2 => self.duplicate_count += 1,
                _ => {}
            }
        }
        group
    }

    /// Remove a tab from the group for `key`, deleting the group once empty
    pub fn remove(&mut self, key: &str, id: TabId) -> bool {
        let Some(group) = self.groups.get_mut(key) else {
            return false;
        };
        if !group.remove(&id) {
            return false;
        }
        match group.len() {
            0 => {
                self.groups.remove(key);
            }
            1 => {
                self.duplicate_count -= 2;
                self.duplicate_groups -= 1;
            }
            _ => self.duplicate_count -= 1,
        }
        true
    }

    /// Groups with more than one member, ordered by key
    pub fn duplicate_groups_with_keys(&self) -> Vec<(String, Group)> {
        let mut groups: Vec<(String, Group)> = self
            .groups
            .iter()
            .filter(|(_, group)| group.len() > 1)
            .map(|(key, group)| (key.clone(), group.clone()))
            .collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        groups
    }

    pub fn duplicate_groups(&self) -> Vec<Group> {
        self.duplicate_groups_with_keys()
            .into_iter()
            .map(|(_, group)| group)
            .collect()
    }

    /// Every tab that has a duplicate, including the one that would be kept
    pub fn duplicate_tabs(&self) -> Vec<TabId> {
        self.duplicate_groups_with_keys()
            .into_iter()
            .flat_map(|(_, group)| group)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recount(index: &WindowIndex) -> usize {
        index.groups().map(|(_, g)| g.len()).filter(|&n| n >= 2).sum()
    }

    #[test]
    fn test_second_member_adds_two() {
        let mut index = WindowIndex::new(IndexScope::Window(1));

        index.insert("A", 1);
        assert_eq!(index.duplicate_count(), 0);

        index.insert("A", 2);
        assert_eq!(index.duplicate_count(), 2);
        assert_eq!(index.closeable_tab_count(), 1);

        index.insert("A", 3);
        assert_eq!(index.duplicate_count(), 3);
        assert_eq!(index.closeable_tab_count(), 2);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut index = WindowIndex::new(IndexScope::Window(1));

        index.insert("A", 1);
        index.insert("A", 2);
        index.insert("A", 2);

        assert_eq!(index.duplicate_count(), 2);
        assert_eq!(index.group("A").map(|g| g.len()), Some(2));
    }

    #[test]
    fn test_breaking_a_pair() {
        let mut index = WindowIndex::new(IndexScope::Window(1));
        index.insert("A", 1);
        index.insert("A", 2);

        assert!(index.remove("A", 2));
        assert_eq!(index.duplicate_count(), 0);
        assert_eq!(index.group("A").map(|g| g.len()), Some(1));

        assert!(index.remove("A", 1));
        assert!(index.group("A").is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_missing_member() {
        let mut index = WindowIndex::new(IndexScope::Window(1));
        index.insert("A", 1);
        index.insert("A", 2);

        assert!(!index.remove("A", 9));
        assert!(!index.remove("B", 1));
        assert_eq!(index.duplicate_count(), 2);
    }

    #[test]
    fn test_count_matches_recount() {
        let mut index = WindowIndex::new(IndexScope::Aggregate);
        for (key, id) in [("A", 1), ("B", 2), ("A", 3), ("A", 4), ("B", 5), ("C", 6)] {
            index.insert(key, id);
            assert_eq!(index.duplicate_count(), recount(&index));
        }
        for (key, id) in [("A", 3), ("B", 2), ("A", 1), ("C", 6)] {
            index.remove(key, id);
            assert_eq!(index.duplicate_count(), recount(&index));
        }
    }

    #[test]
    fn test_duplicate_queries() {
        let mut index = WindowIndex::new(IndexScope::Window(1));
        index.insert("b", 4);
        index.insert("a", 3);
        index.insert("a", 1);
        index.insert("b", 2);
        index.insert("c", 5);

        assert_eq!(index.duplicate_tabs(), vec![1, 3, 2, 4]);
        assert_eq!(index.duplicate_groups().len(), 2);

        let keys: Vec<String> = index
            .duplicate_groups_with_keys()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_clear() {
        let mut index = WindowIndex::new(IndexScope::Window(1));
        index.insert("A", 1);
        index.insert("A", 2);

        index.clear();

        assert_eq!(index.scope(), IndexScope::Window(1));
        assert!(index.is_empty());
        assert_eq!(index.duplicate_count(), 0);
        assert_eq!(index.closeable_tab_count(), 0);
    }
}
