//! Service URL resolution.
//!
//! Lookup walks the configuration tree under `services/`:
//!
//! ```text
//! <services>
//!   <service id="structured-data" domain="https://sds.internal:8443">
//!     <methods>
//!       <method id="query" path="/api/v1/query"/>
//!       <method id="*" path="/api/v1"/>
//!     </methods>
//!   </service>
//! </services>
//! ```
//!
//! The direct method match wins; a `*` method entry is the generic
//! fallback; a service with no method table may carry a `path` attribute
//! itself. The composed URL is `domain` + `path`, cached under
//! `serviceId___methodId` until the configuration generation advances.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use tabula_config::{ConfigNode, ConfigStore, STATUS_UNAVAILABLE};

/// Separator used in cache keys: `serviceId___methodId`.
pub const CACHE_KEY_SEPARATOR: &str = "___";

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (including unresolvable lookups).
    pub misses: u64,
    /// Number of entries currently cached.
    pub size: usize,
}

/// Resolves sibling-service URLs from the configuration tree.
///
/// Reads are lock-free; the cache is populated add-if-absent and cleared
/// as a whole when the configuration store publishes a new generation.
#[derive(Debug)]
pub struct ServiceLocator {
    store: Arc<ConfigStore>,
    cache: DashMap<String, String>,
    cached_generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ServiceLocator {
    /// Creates a locator over the given configuration store.
    #[must_use]
    pub fn new(store: Arc<ConfigStore>) -> Self {
        let generation = store.generation();
        Self {
            store,
            cache: DashMap::new(),
            cached_generation: AtomicU64::new(generation),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Resolves the URL for a service method.
    ///
    /// Returns `None` (and logs a warning) when no registration matches;
    /// callers must treat this as "service unavailable", not as an error
    /// to propagate.
    #[must_use]
    pub fn resolve(&self, service_id: &str, method_id: &str) -> Option<String> {
        self.invalidate_if_stale();

        let key = cache_key(service_id, method_id);
        if let Some(url) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(url.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let snapshot = self.store.snapshot();
        let Some(url) = lookup(&snapshot, service_id, method_id) else {
            warn!(service_id, method_id, "no service registration matched");
            return None;
        };

        self.cache.entry(key).or_insert_with(|| url.clone());
        Some(url)
    }

    /// Returns true when the service is registered and not marked
    /// unavailable by a failover refresh.
    #[must_use]
    pub fn is_available(&self, service_id: &str) -> bool {
        let snapshot = self.store.snapshot();
        snapshot
            .select(&format!("services/service[@id='{service_id}']"))
            .is_some_and(|svc| svc.attr("status") != Some(STATUS_UNAVAILABLE))
    }

    /// Returns cache statistics.
    #[must_use]
    pub fn stats(&self) -> LocatorStats {
        LocatorStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.cache.len(),
        }
    }

    fn invalidate_if_stale(&self) {
        let generation = self.store.generation();
        if self.cached_generation.swap(generation, Ordering::AcqRel) != generation {
            self.cache.clear();
        }
    }
}

fn cache_key(service_id: &str, method_id: &str) -> String {
    format!("{service_id}{CACHE_KEY_SEPARATOR}{method_id}")
}

fn lookup(tree: &ConfigNode, service_id: &str, method_id: &str) -> Option<String> {
    let service = tree.select(&format!("services/service[@id='{service_id}']"))?;
    let domain = service.attr("domain")?;

    let path = service
        .select(&format!("methods/method[@id='{method_id}']"))
        .or_else(|| service.select("methods/method[@id='*']"))
        .and_then(|m| m.attr("path"))
        .or_else(|| service.attr("path"))?;

    Some(format!("{domain}{path}"))
}
