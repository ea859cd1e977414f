//! # Entity Database
//!
//! Thread-safe producer and retirer of [`Entity`] handles.
//!
//! ```text
//!   create() ──> free list (FIFO) ──or──> next unused index ──> Entity(index, gen)
//!   destroy() ─> gen += 1, index -> free list ──(lock released)──> listeners
//!   is_alive() ─> generation table (lock-free)
//! ```
//!
//! ## Locks
//!
//! - Free list + index counter + generation writes: one mutex.
//! - Listener set: a second, independent mutex.
//! - Component-set registry: a third mutex, for lookup and creation only.
//! - Each component set: its own mutex, taken by whoever holds its handle.
//!
//! Locking set `A` never blocks access to set `B`, so a thread may hold
//! several sets at once, and a listener may lock a set while the thread
//! calling `destroy` holds another.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::entity::{Entity, MAX_ENTITY_COUNT};
use super::generation::GenerationTable;
use super::listener::{DestroyedBatch, EntityListener};
use super::registry::{ComponentSet, ComponentSetRegistry, SetHandle};
use super::schema::SchemaTable;
use crate::config::DatabaseConfig;
use crate::error::DatabaseResult;

/// State guarded by the free-list mutex.
struct Allocator {
    /// Next never-used index. Starts at 1; index 0 is the null handle.
    next_index: u32,
    /// Retired indices, oldest first.
    free_list: VecDeque<u32>,
}

/// The entity allocator and owner of all component sets.
///
/// # Example
///
/// ```rust,ignore
/// let db = Database::new();
///
/// let e = db.create();
/// assert!(db.is_alive(e));
///
/// db.component_set_or_create::<Motion>().lock().add_component(e);
///
/// db.destroy(e);
/// assert!(!db.is_alive(e));
/// ```
pub struct Database {
    config: DatabaseConfig,
    allocator: Mutex<Allocator>,
    generations: GenerationTable,
    listeners: Mutex<Vec<Arc<dyn EntityListener>>>,
    destruction_epoch: AtomicU64,
    component_sets: Mutex<ComponentSetRegistry>,
}

impl Database {
    /// Maximum number of simultaneously alive entities in any configuration.
    pub const MAX_ENTITY_COUNT: usize = MAX_ENTITY_COUNT;

    /// Creates a database with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(DatabaseConfig::default(), ComponentSetRegistry::new())
    }

    /// Creates a database from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidConfig`](crate::DatabaseError::InvalidConfig)
    /// if the configuration is out of range.
    pub fn with_config(config: DatabaseConfig) -> DatabaseResult<Self> {
        config.validate()?;
        Ok(Self::build(config, ComponentSetRegistry::new()))
    }

    /// Creates a database whose component sets use the ids of `schemas`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidConfig`](crate::DatabaseError::InvalidConfig)
    /// if the configuration is out of range.
    pub fn with_schemas(config: DatabaseConfig, schemas: SchemaTable) -> DatabaseResult<Self> {
        config.validate()?;
        Ok(Self::build(config, ComponentSetRegistry::with_schema_table(schemas)))
    }

    fn build(config: DatabaseConfig, registry: ComponentSetRegistry) -> Self {
        let pages = config.preallocated_pages.min(config.page_budget());
        tracing::debug!(
            max_entity_count = config.max_entity_count,
            preallocated_pages = pages,
            "creating entity database"
        );
        Self {
            allocator: Mutex::new(Allocator {
                next_index: 1,
                free_list: VecDeque::with_capacity(config.free_list_capacity),
            }),
            generations: GenerationTable::new(pages),
            listeners: Mutex::new(Vec::new()),
            destruction_epoch: AtomicU64::new(0),
            component_sets: Mutex::new(registry),
            config,
        }
    }

    /// Active configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Maximum number of entities that can be alive at the same time.
    #[inline]
    #[must_use]
    pub fn max_entity_count(&self) -> usize {
        self.config.max_entity_count
    }

    /// Number of alive entities at the time of the call.
    ///
    /// Only an estimate while other threads create or destroy.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        let allocator = self.allocator.lock();
        (allocator.next_index as usize - 1) - allocator.free_list.len()
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Creates one entity.
    ///
    /// Returns [`Entity::NULL`] if the index space is exhausted.
    #[must_use]
    pub fn create(&self) -> Entity {
        let mut entity = [Entity::NULL];
        self.create_into(&mut entity);
        entity[0]
    }

    /// Creates `n` entities.
    ///
    /// Entries past the point of exhaustion are [`Entity::NULL`]; the rest of
    /// the batch still succeeds.
    #[must_use]
    pub fn create_many(&self, n: usize) -> Vec<Entity> {
        let mut entities = vec![Entity::NULL; n];
        self.create_into(&mut entities);
        entities
    }

    /// Fills `out` with new entities, under a single lock acquisition.
    ///
    /// Recycled indices are used first (oldest first). Slots that cannot be
    /// filled because the index space is exhausted are set to
    /// [`Entity::NULL`].
    pub fn create_into(&self, out: &mut [Entity]) {
        let max_index = self.config.max_entity_count;
        let mut exhausted = 0usize;

        let mut allocator = self.allocator.lock();
        for slot in out.iter_mut() {
            let index = if let Some(index) = allocator.free_list.pop_front() {
                index
            } else if allocator.next_index as usize > max_index {
                *slot = Entity::NULL;
                exhausted += 1;
                continue;
            } else {
                let index = allocator.next_index;
                allocator.next_index += 1;
                self.generations.ensure(index);
                index
            };
            let generation = self.generations.get(index).unwrap_or(0);
            *slot = Entity::new(index, generation);
        }
        drop(allocator);

        if exhausted > 0 {
            tracing::warn!(
                requested = out.len(),
                exhausted,
                max_entity_count = max_index,
                "entity index space exhausted, returning null handles"
            );
        }
    }

    /// Destroys one entity. Destroying [`Entity::NULL`] is a no-op.
    pub fn destroy(&self, entity: Entity) {
        self.destroy_batch(&[entity]);
    }

    /// Destroys a batch of entities and notifies every listener once.
    ///
    /// Null handles are skipped. Destroying a handle that is not alive is a
    /// caller bug: it trips a debug assertion, and in release builds it is
    /// logged and ignored without touching internal state.
    ///
    /// Listeners run after the free-list lock is released, so another thread
    /// may already have recycled the freed indices when they are called.
    pub fn destroy_batch(&self, entities: &[Entity]) {
        let mut rejected = 0usize;
        // Stays `None` while every handle so far was retired, so the common
        // case hands the caller's slice to listeners without copying.
        let mut partial: Option<Vec<Entity>> = None;

        let mut allocator = self.allocator.lock();
        for (i, &entity) in entities.iter().enumerate() {
            let retire = !entity.is_null() && {
                let alive = self.is_alive(entity);
                debug_assert!(alive, "destroying entity {entity} which is not alive");
                if !alive {
                    rejected += 1;
                }
                alive
            };
            if retire {
                allocator.free_list.push_back(entity.index());
                self.generations.bump(entity.index());
                if let Some(retired) = partial.as_mut() {
                    retired.push(entity);
                }
            } else if partial.is_none() {
                partial = Some(entities[..i].to_vec());
            }
        }
        let retired: Cow<'_, [Entity]> = match partial {
            Some(retired) => Cow::Owned(retired),
            None => Cow::Borrowed(entities),
        };
        let epoch = if retired.is_empty() {
            self.destruction_epoch.load(Ordering::Acquire)
        } else {
            self.destruction_epoch.fetch_add(1, Ordering::AcqRel) + 1
        };
        drop(allocator);

        if rejected > 0 {
            tracing::error!(rejected, "ignored destroy of entities that are not alive");
        }
        if retired.is_empty() {
            return;
        }
        tracing::trace!(epoch, count = retired.len(), "destroyed entities");

        let listeners = self.listeners.lock().clone();
        let batch = DestroyedBatch::new(epoch, &retired);
        for listener in &listeners {
            listener.on_entities_destroyed(batch);
        }
    }

    /// Returns `true` if `entity` is not null and its generation is current.
    ///
    /// Lock-free. May briefly report a handle as alive while another thread
    /// is inside `destroy` for it.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        !entity.is_null() && self.generations.get(entity.index()) == Some(entity.generation())
    }

    /// Current generation of `index`, or `None` if the index was never used.
    ///
    /// A listener can compare this with a destroyed handle's generation to
    /// see whether the index has been recycled since.
    #[inline]
    #[must_use]
    pub fn generation_of(&self, index: u32) -> Option<u8> {
        self.generations.get(index)
    }

    /// Number of destroy batches that retired at least one entity.
    #[inline]
    #[must_use]
    pub fn destruction_epoch(&self) -> u64 {
        self.destruction_epoch.load(Ordering::Acquire)
    }

    /// Number of generation-table pages currently allocated.
    #[must_use]
    pub fn generation_pages(&self) -> usize {
        self.generations.materialized_pages()
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Adds a destruction listener. Returns `false` if it was already registered.
    pub fn register_listener(&self, listener: Arc<dyn EntityListener>) -> bool {
        let mut listeners = self.listeners.lock();
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        tracing::debug!(listeners = listeners.len(), "registered entity listener");
        true
    }

    /// Removes a destruction listener. Returns `false` if it was not registered.
    pub fn unregister_listener(&self, listener: &Arc<dyn EntityListener>) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        let removed = listeners.len() != before;
        if removed {
            tracing::debug!(listeners = listeners.len(), "unregistered entity listener");
        }
        removed
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    // =========================================================================
    // Component sets
    // =========================================================================

    /// The component set `T`, which must already exist.
    ///
    /// # Panics
    ///
    /// Panics if no instance of `T` was created.
    #[must_use]
    pub fn component_set<T: ComponentSet>(&self) -> SetHandle<T> {
        match self.try_component_set::<T>() {
            Some(set) => set,
            None => panic!(
                "component set {} is not registered",
                std::any::type_name::<T>()
            ),
        }
    }

    /// The component set `T`, if it exists.
    #[must_use]
    pub fn try_component_set<T: ComponentSet>(&self) -> Option<SetHandle<T>> {
        self.component_sets.lock().get::<T>()
    }

    /// The component set `T`, created on first use.
    ///
    /// # Panics
    ///
    /// Panics if the database was built from a schema table that does not
    /// declare `T`.
    #[must_use]
    pub fn component_set_or_create<T: ComponentSet + Default>(&self) -> SetHandle<T> {
        self.component_sets.lock().get_or_create::<T>()
    }

    /// Creates the component set `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` already exists or is not declared in the schema table.
    pub fn register_component_set<T: ComponentSet + Default>(&self) -> SetHandle<T> {
        match self.try_register_component_set::<T>() {
            Ok(set) => set,
            Err(e) => panic!("{e}"),
        }
    }

    /// Creates the component set `T`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::SchemaAlreadyRegistered`](crate::DatabaseError::SchemaAlreadyRegistered)
    /// if it exists, or [`DatabaseError::UndeclaredSchema`](crate::DatabaseError::UndeclaredSchema)
    /// if it is not declared in the schema table.
    pub fn try_register_component_set<T: ComponentSet + Default>(
        &self,
    ) -> DatabaseResult<SetHandle<T>> {
        self.component_sets.lock().register::<T>()
    }

    /// Direct access to the registry for an exclusive owner. No locking.
    pub fn component_sets_mut(&mut self) -> &mut ComponentSetRegistry {
        self.component_sets.get_mut()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

fn same_listener(a: &Arc<dyn EntityListener>, b: &Arc<dyn EntityListener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}
