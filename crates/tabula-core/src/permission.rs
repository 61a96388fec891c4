//! Permission grants.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The wildcard grant. Holders pass every permission check.
pub const WILDCARD: &str = "*";

/// A set of permission grants held by a caller.
///
/// Grants are plain strings (role or permission names); `*` grants
/// everything. The hierarchy filter evaluates node requirements against
/// this set.
///
/// # Example
///
/// ```
/// use tabula_core::PermissionSet;
///
/// let perms = PermissionSet::from_iter(["editor".to_string()]);
/// assert!(perms.grants("editor"));
/// assert!(!perms.grants("admin"));
/// assert!(PermissionSet::wildcard().grants("admin"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding only the wildcard grant.
    #[must_use]
    pub fn wildcard() -> Self {
        let mut set = BTreeSet::new();
        set.insert(WILDCARD.to_string());
        Self(set)
    }

    /// Adds a grant.
    pub fn insert(&mut self, grant: impl Into<String>) {
        self.0.insert(grant.into());
    }

    /// Returns true if the set holds the grant or the wildcard.
    #[must_use]
    pub fn grants(&self, permission: &str) -> bool {
        self.0.contains(WILDCARD) || self.0.contains(permission)
    }

    /// Returns true if any of the given permissions is granted.
    ///
    /// An empty requirement list is public: always granted.
    #[must_use]
    pub fn grants_any<'a>(&self, permissions: impl IntoIterator<Item = &'a str>) -> bool {
        let mut any = false;
        for p in permissions {
            if self.grants(p) {
                return true;
            }
            any = true;
        }
        !any
    }

    /// Returns true if no grants are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of grants held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the grants.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
