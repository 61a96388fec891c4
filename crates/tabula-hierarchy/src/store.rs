//! Shared hierarchy handle.
//!
//! The hierarchy is rebuilt whenever the configuration tree is refreshed;
//! requests read whichever build was current when they started. The same
//! replace-as-unit discipline as the configuration store applies.

use std::sync::Arc;

use arc_swap::ArcSwap;

use tabula_config::ConfigNode;

use crate::error::HierarchyError;
use crate::node::SiteHierarchy;

/// Process-wide, atomically replaceable site hierarchy.
#[derive(Debug)]
pub struct HierarchyStore {
    inner: ArcSwap<SiteHierarchy>,
}

impl HierarchyStore {
    /// Creates a store holding the given hierarchy.
    #[must_use]
    pub fn new(hierarchy: SiteHierarchy) -> Self {
        Self {
            inner: ArcSwap::from_pointee(hierarchy),
        }
    }

    /// Creates a store holding an empty hierarchy.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(SiteHierarchy::new(Vec::new()))
    }

    /// Returns the current hierarchy.
    #[must_use]
    pub fn load(&self) -> Arc<SiteHierarchy> {
        self.inner.load_full()
    }

    /// Installs a new hierarchy.
    pub fn install(&self, hierarchy: SiteHierarchy) {
        self.inner.store(Arc::new(hierarchy));
    }

    /// Rebuilds the hierarchy from the `hierarchy` section of a
    /// configuration snapshot. A snapshot without a hierarchy section
    /// installs the empty tree.
    pub fn rebuild_from(&self, config: &ConfigNode) -> Result<(), HierarchyError> {
        let hierarchy = match config.child("hierarchy") {
            Some(section) => SiteHierarchy::from_config(section)?,
            None => SiteHierarchy::new(Vec::new()),
        };
        self.install(hierarchy);
        Ok(())
    }
}
