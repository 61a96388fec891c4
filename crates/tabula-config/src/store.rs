//! Process-wide configuration store.
//!
//! The store holds the configuration tree behind an [`ArcSwap`]: readers
//! take a cheap snapshot that can never change under them, writers publish
//! a whole new tree (or a tree with one section replaced). There is no
//! in-place mutation, so a half-updated tree is unobservable by design of
//! the data structure, and lock-free reads scale with request concurrency.
//!
//! Writers are the scheduled refresh tasks only; request handling never
//! mutates configuration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::tree::ConfigNode;

/// Shared, atomically replaceable configuration tree.
///
/// # Example
///
/// ```
/// use tabula_config::{ConfigNode, ConfigStore};
///
/// let root = ConfigNode::new("configuration")
///     .with_child(ConfigNode::new("services"));
/// let store = ConfigStore::new(root);
///
/// let snapshot = store.snapshot();
/// assert!(snapshot.child("services").is_some());
/// ```
#[derive(Debug)]
pub struct ConfigStore {
    tree: ArcSwap<ConfigNode>,
    generation: AtomicU64,
}

impl ConfigStore {
    /// Creates a store holding the given tree.
    #[must_use]
    pub fn new(root: ConfigNode) -> Self {
        Self {
            tree: ArcSwap::from_pointee(root),
            generation: AtomicU64::new(0),
        }
    }

    /// Creates a store holding an empty `<configuration/>` tree.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(ConfigNode::new("configuration"))
    }

    /// Returns a snapshot of the current tree.
    ///
    /// The snapshot is immutable and remains valid (and unchanged) for as
    /// long as the caller holds it, regardless of concurrent replacements.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ConfigNode> {
        self.tree.load_full()
    }

    /// The current generation counter.
    ///
    /// Incremented on every replacement; caches key their contents to the
    /// generation they were filled from and invalidate when it advances.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Replaces the whole tree.
    pub fn replace(&self, root: ConfigNode) {
        self.tree.store(Arc::new(root));
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Replaces one top-level section (child of the root) as a unit.
    ///
    /// The current tree is cloned, the section swapped (or appended when
    /// absent), and the result published atomically. Concurrent section
    /// replacements are serialized via compare-and-swap retry, so neither
    /// update is lost.
    pub fn replace_section(&self, section: ConfigNode) {
        self.tree.rcu(|current| {
            let mut next = ConfigNode::clone(current);
            next.replace_or_push_child(section.clone());
            next
        });
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_services(rev: &str) -> ConfigStore {
        let root = ConfigNode::new("configuration")
            .with_child(ConfigNode::new("services").with_attr("rev", rev));
        ConfigStore::new(root)
    }

    #[test]
    fn test_snapshot_reads_current_tree() {
        let store = store_with_services("1");
        assert_eq!(
            store.snapshot().child("services").unwrap().attr("rev"),
            Some("1")
        );
    }

    #[test]
    fn test_replace_bumps_generation() {
        let store = ConfigStore::empty();
        assert_eq!(store.generation(), 0);
        store.replace(ConfigNode::new("configuration"));
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_snapshot_is_stable_across_replace() {
        let store = store_with_services("1");
        let before = store.snapshot();

        store.replace_section(ConfigNode::new("services").with_attr("rev", "2"));

        // The old snapshot still sees rev 1; a fresh one sees rev 2.
        assert_eq!(before.child("services").unwrap().attr("rev"), Some("1"));
        assert_eq!(
            store.snapshot().child("services").unwrap().attr("rev"),
            Some("2")
        );
    }

    #[test]
    fn test_replace_section_appends_when_missing() {
        let store = ConfigStore::empty();
        store.replace_section(ConfigNode::new("projects"));
        assert!(store.snapshot().child("projects").is_some());
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_replace_section_preserves_siblings() {
        let store = store_with_services("1");
        store.replace_section(ConfigNode::new("projects"));
        let snapshot = store.snapshot();
        assert!(snapshot.child("services").is_some());
        assert!(snapshot.child("projects").is_some());
    }
}
