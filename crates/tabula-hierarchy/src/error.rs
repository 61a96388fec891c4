//! Hierarchy error types.

use thiserror::Error;

/// Errors raised while building the site hierarchy from configuration.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// The configuration section handed in is not a hierarchy.
    #[error("expected <hierarchy> section, got <{found}>")]
    WrongSection {
        /// The element name that was found.
        found: String,
    },

    /// A child element other than `<page>` appeared in the tree.
    #[error("unexpected element <{found}> in hierarchy")]
    UnexpectedElement {
        /// The element name that was found.
        found: String,
    },

    /// A page element is missing a required attribute.
    #[error("page element missing required attribute '{attr}'")]
    MissingAttr {
        /// The missing attribute name.
        attr: String,
    },
}

impl HierarchyError {
    /// Creates a missing-attribute error.
    pub fn missing_attr(attr: impl Into<String>) -> Self {
        Self::MissingAttr { attr: attr.into() }
    }
}
