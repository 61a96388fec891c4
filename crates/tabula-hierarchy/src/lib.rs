//! # Tabula Hierarchy
//!
//! The site hierarchy tree and its RBAC-stripped variant.
//!
//! A [`SiteHierarchy`] is parsed from the configuration tree and resolves
//! URL paths to page ids. [`SiteHierarchy::strip`] derives the
//! permission-filtered tree used for navigation rendering and access
//! enforcement: no disallowed node survives, and every surviving node's
//! ancestors survive with it.

#![doc(html_root_url = "https://docs.rs/tabula-hierarchy/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod node;
mod store;

pub use error::HierarchyError;
pub use node::{PageNode, SiteHierarchy};
pub use store::HierarchyStore;
