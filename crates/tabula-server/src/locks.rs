//! Document edit locks.
//!
//! The editor takes an exclusive lock on a document before writing to it.
//! Locks live in memory with a TTL; a crashed or wandered-off editor's
//! lock is retired by the 5-minute job rather than blocking the document
//! forever.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;

/// A held edit lock.
#[derive(Debug, Clone)]
pub struct EditLock {
    /// The locked document.
    pub document_id: String,
    /// User id holding the lock.
    pub owner: String,
    /// When the lock was taken or last renewed.
    pub acquired_at: Instant,
}

/// Lock acquisition failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    /// The document is locked by someone else.
    #[error("document '{document_id}' is locked by '{holder}'")]
    Held {
        /// The locked document.
        document_id: String,
        /// The current holder.
        holder: String,
    },
}

/// In-memory edit-lock registry with TTL retirement.
#[derive(Debug)]
pub struct LockRegistry {
    locks: DashMap<String, EditLock>,
    ttl: Duration,
}

impl LockRegistry {
    /// Creates a registry with the given lock TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            ttl,
        }
    }

    /// Acquires (or renews) the lock on a document.
    ///
    /// Re-acquiring one's own lock renews it; a lock held by another user
    /// fails unless it has gone stale.
    pub fn acquire(&self, document_id: &str, owner: &str) -> Result<EditLock, LockError> {
        let mut entry = self
            .locks
            .entry(document_id.to_string())
            .or_insert_with(|| EditLock {
                document_id: document_id.to_string(),
                owner: owner.to_string(),
                acquired_at: Instant::now(),
            });

        let stale = entry.acquired_at.elapsed() > self.ttl;
        if entry.owner != owner && !stale {
            return Err(LockError::Held {
                document_id: document_id.to_string(),
                holder: entry.owner.clone(),
            });
        }

        entry.owner = owner.to_string();
        entry.acquired_at = Instant::now();
        Ok(entry.clone())
    }

    /// Releases a lock held by the given owner. Releasing a lock one
    /// does not hold is a no-op.
    pub fn release(&self, document_id: &str, owner: &str) {
        self.locks
            .remove_if(document_id, |_, lock| lock.owner == owner);
    }

    /// The current holder of a document's lock, if any.
    #[must_use]
    pub fn holder(&self, document_id: &str) -> Option<String> {
        self.locks.get(document_id).map(|lock| lock.owner.clone())
    }

    /// Drops every lock past its TTL. Returns the number retired.
    pub fn retire_stale(&self) -> usize {
        let before = self.locks.len();
        let ttl = self.ttl;
        self.locks.retain(|_, lock| lock.acquired_at.elapsed() <= ttl);
        before - self.locks.len()
    }

    /// Number of held locks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// True when no locks are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
