//! # Tabula Locator
//!
//! Resolves `(service id, method id)` pairs to sibling-service URLs using
//! the shared configuration tree, with a lazily populated concurrent cache.
//!
//! Resolution never fails hard: an unknown service or method yields `None`
//! and a warning, and callers treat that as "service unavailable".

#![doc(html_root_url = "https://docs.rs/tabula-locator/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod locator;

pub use locator::{LocatorStats, ServiceLocator, CACHE_KEY_SEPARATOR};
