//! # Destruction Listeners
//!
//! Collaborators (usually component managers) learn about destroyed entities
//! through [`EntityListener`]. The database calls every registered listener
//! once per `destroy` call, with the whole batch, after it has released its
//! free-list lock.
//!
//! ## Recycling hazard
//!
//! ```text
//! Thread A: destroy([e])  -> generation + 1, index freed, lock released
//! Thread B: create()      -> same index, new handle, alive
//! Thread A: notify(e)     -> listeners see e
//! ```
//!
//! A batch means "these handles are no longer alive", never "these indices
//! are unused". Key per-entity state by the full handle. Each batch carries
//! a destruction epoch, and
//! [`Database::generation_of`](super::Database::generation_of) is past
//! `e.generation() + 1` once the index has been retired again.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::entity::Entity;

/// One `destroy` call, as seen by listeners.
#[derive(Clone, Copy, Debug)]
pub struct DestroyedBatch<'a> {
    epoch: u64,
    entities: &'a [Entity],
}

impl<'a> DestroyedBatch<'a> {
    pub(crate) const fn new(epoch: u64, entities: &'a [Entity]) -> Self {
        Self { epoch, entities }
    }

    /// Sequence number of this batch. Strictly increasing per database.
    #[inline]
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Handles retired by this batch. Never contains the null handle.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> &'a [Entity] {
        self.entities
    }

    /// Number of handles in the batch.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the batch is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Receives destruction notifications from a [`Database`](super::Database).
///
/// Implementations must not call `destroy` on the same database from inside
/// the callback without accounting for the recycling hazard above.
pub trait EntityListener: Send + Sync {
    /// Called once per `destroy` call that retired at least one handle.
    ///
    /// A call that retires nothing (an empty or all-null batch, or only
    /// handles that were already dead) produces no notification, so every
    /// batch seen here is non-empty and has a fresh epoch.
    fn on_entities_destroyed(&self, batch: DestroyedBatch<'_>);
}

/// Listener that buffers destroyed handles until the owning thread drains them.
///
/// Component managers have no internal locking, so they cannot be listeners
/// themselves. Register a `DestroyedQueue` instead and feed its contents to
/// [`SparseComponentManager::remove_components`](super::SparseComponentManager::remove_components)
/// once per frame.
#[derive(Debug, Default)]
pub struct DestroyedQueue {
    pending: Mutex<Vec<Entity>>,
    last_epoch: AtomicU64,
}

impl DestroyedQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every buffered handle, oldest first.
    pub fn drain(&self) -> Vec<Entity> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Number of buffered handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Epoch of the most recent batch received (0 if none).
    #[must_use]
    pub fn last_epoch(&self) -> u64 {
        self.last_epoch.load(Ordering::Acquire)
    }
}

impl EntityListener for DestroyedQueue {
    fn on_entities_destroyed(&self, batch: DestroyedBatch<'_>) {
        self.pending.lock().extend_from_slice(batch.entities());
        self.last_epoch.fetch_max(batch.epoch(), Ordering::AcqRel);
    }
}
