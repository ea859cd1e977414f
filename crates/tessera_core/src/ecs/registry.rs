//! # Component-Set Registry
//!
//! One instance per component-set type, keyed by [`SchemaId`].
//!
//! Every set sits behind its own mutex and is handed out as a shared
//! [`SetHandle`]. The registry itself is only consulted for lookup and
//! creation, so any number of different sets can be locked at once:
//!
//! ```rust,ignore
//! let motion = registry.get_or_create::<Motion>();
//! let health = registry.get_or_create::<Health>();
//! let (mut motion, mut health) = (motion.lock(), health.lock());
//! ```

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::schema::{schema_id_of, SchemaId, SchemaTable};
use crate::error::{DatabaseError, DatabaseResult};

/// Type-erased component storage held by a registry.
///
/// Implemented by [`SparseComponentManager`](super::SparseComponentManager)
/// and [`DenseComponentSet`](super::DenseComponentSet). Wrap them in a
/// newtype to register two sets with the same column layout.
pub trait ComponentSet: Any + Send {
    /// Number of live components.
    fn component_count(&self) -> usize;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Shared, individually locked component set.
pub type SetHandle<T> = Arc<Mutex<T>>;

/// Shared, individually locked component set of unknown type.
pub type ErasedSetHandle = Arc<Mutex<dyn ComponentSet>>;

#[derive(Debug)]
enum SchemaSource {
    ProcessWide,
    Fixed(SchemaTable),
}

/// Two views of the same allocation: one to recover `Mutex<T>`, one to
/// reach the set without knowing `T`.
struct Slot {
    typed: Arc<dyn Any + Send + Sync>,
    erased: ErasedSetHandle,
}

impl Slot {
    fn new<T: ComponentSet + Default>() -> Self {
        let set: SetHandle<T> = Arc::new(Mutex::new(T::default()));
        let erased: ErasedSetHandle = set.clone();
        Self { typed: set, erased }
    }

    fn handle<T: ComponentSet>(&self) -> SetHandle<T> {
        match Arc::clone(&self.typed).downcast::<Mutex<T>>() {
            Ok(set) => set,
            Err(_) => unreachable!("schema id of {} maps to another type", type_name::<T>()),
        }
    }
}

/// Map from schema id to component-set instance.
pub struct ComponentSetRegistry {
    source: SchemaSource,
    sets: HashMap<SchemaId, Slot>,
}

impl ComponentSetRegistry {
    /// Creates a registry using process-wide, lazily assigned schema ids.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: SchemaSource::ProcessWide,
            sets: HashMap::new(),
        }
    }

    /// Creates a registry that only accepts the types declared in `table`.
    #[must_use]
    pub fn with_schema_table(table: SchemaTable) -> Self {
        Self {
            source: SchemaSource::Fixed(table),
            sets: HashMap::new(),
        }
    }

    /// Schema id used for `T` by this registry.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::UndeclaredSchema`] if the registry was built
    /// from a table that does not declare `T`.
    pub fn schema_id<T: ComponentSet>(&self) -> DatabaseResult<SchemaId> {
        match &self.source {
            SchemaSource::ProcessWide => Ok(schema_id_of::<T>()),
            SchemaSource::Fixed(table) => table.id_of::<T>().ok_or(DatabaseError::UndeclaredSchema {
                type_name: type_name::<T>(),
            }),
        }
    }

    /// Whether an instance of `T` exists.
    #[must_use]
    pub fn contains<T: ComponentSet>(&self) -> bool {
        self.schema_id::<T>()
            .is_ok_and(|id| self.sets.contains_key(&id))
    }

    /// The instance of `T`, if it exists.
    #[must_use]
    pub fn get<T: ComponentSet>(&self) -> Option<SetHandle<T>> {
        let id = self.schema_id::<T>().ok()?;
        self.sets.get(&id).map(Slot::handle::<T>)
    }

    /// The instance registered under `id`, whatever its type.
    #[must_use]
    pub fn get_erased(&self, id: SchemaId) -> Option<ErasedSetHandle> {
        self.sets.get(&id).map(|slot| Arc::clone(&slot.erased))
    }

    /// The instance of `T`, created with `T::default()` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::UndeclaredSchema`] for types missing from a
    /// fixed schema table.
    pub fn try_get_or_create<T: ComponentSet + Default>(&mut self) -> DatabaseResult<SetHandle<T>> {
        let id = self.schema_id::<T>()?;
        let slot = self.sets.entry(id).or_insert_with(|| {
            tracing::debug!(schema = id.get(), type_name = type_name::<T>(), "created component set");
            Slot::new::<T>()
        });
        Ok(slot.handle::<T>())
    }

    /// The instance of `T`, created with `T::default()` if absent.
    ///
    /// # Panics
    ///
    /// Panics if `T` is missing from a fixed schema table.
    pub fn get_or_create<T: ComponentSet + Default>(&mut self) -> SetHandle<T> {
        match self.try_get_or_create::<T>() {
            Ok(set) => set,
            Err(e) => panic!("{e}"),
        }
    }

    /// Creates the instance of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::SchemaAlreadyRegistered`] if it already
    /// exists, or [`DatabaseError::UndeclaredSchema`] for types missing from
    /// a fixed schema table.
    pub fn register<T: ComponentSet + Default>(&mut self) -> DatabaseResult<SetHandle<T>> {
        let id = self.schema_id::<T>()?;
        if self.sets.contains_key(&id) {
            return Err(DatabaseError::SchemaAlreadyRegistered {
                schema: id.get(),
                type_name: type_name::<T>(),
            });
        }
        self.try_get_or_create::<T>()
    }

    /// Number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no instance exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// `(schema, live component count)` for every instance, in schema order.
    ///
    /// The count is `None` for a set that is locked elsewhere at the time of
    /// the call.
    #[must_use]
    pub fn component_counts(&self) -> Vec<(SchemaId, Option<usize>)> {
        let mut counts: Vec<_> = self
            .sets
            .iter()
            .map(|(id, slot)| (*id, slot.erased.try_lock().map(|set| set.component_count())))
            .collect();
        counts.sort_unstable();
        counts
    }
}

impl Default for ComponentSetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Database, SparseComponentManager};

    #[derive(Default)]
    struct Health(SparseComponentManager<(u32,)>);

    impl ComponentSet for Health {
        fn component_count(&self) -> usize {
            self.0.component_count()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    type Motion = SparseComponentManager<(f32, f32)>;

    #[test]
    fn test_get_or_create_is_singleton() {
        let db = Database::new();
        let mut registry = ComponentSetRegistry::new();
        assert!(registry.get::<Motion>().is_none());

        let e = db.create();
        registry.get_or_create::<Motion>().lock().add_component(e);
        assert!(registry.contains::<Motion>());
        assert_eq!(registry.get_or_create::<Motion>().lock().component_count(), 1);
        assert_eq!(registry.len(), 1);

        let first = registry.get_or_create::<Motion>();
        let second = registry.get::<Motion>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_distinct_schemas_get_distinct_sets() {
        let db = Database::new();
        let mut registry = ComponentSetRegistry::new();
        let e = db.create();
        registry.get_or_create::<Motion>().lock().add_component(e);
        registry.get_or_create::<Health>();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get::<Health>().map(|h| h.lock().component_count()),
            Some(0)
        );
        assert_ne!(
            registry.schema_id::<Motion>().unwrap(),
            registry.schema_id::<Health>().unwrap()
        );
    }

    #[test]
    fn test_two_sets_locked_together() {
        let db = Database::new();
        let mut registry = ComponentSetRegistry::new();
        let motion = registry.get_or_create::<Motion>();
        let health = registry.get_or_create::<Health>();

        let e = db.create();
        let mut motion = motion.lock();
        let mut health = health.lock();
        motion.insert(e, (1.0, 2.0));
        health.0.insert(e, (100,));

        assert_eq!(motion.get(e), Some((&1.0, &2.0)));
        assert_eq!(health.0.get(e), Some((&100,)));
    }

    #[test]
    fn test_register_twice_fails() {
        let mut registry = ComponentSetRegistry::new();
        assert!(registry.register::<Health>().is_ok());
        let err = registry.register::<Health>().err().unwrap();
        assert!(matches!(err, DatabaseError::SchemaAlreadyRegistered { .. }));
    }

    #[test]
    fn test_fixed_table_rejects_undeclared() {
        let table = SchemaTable::builder().declare::<Health>().build();
        let mut registry = ComponentSetRegistry::with_schema_table(table);

        assert_eq!(registry.schema_id::<Health>().map(SchemaId::get), Ok(0));
        assert!(registry.register::<Health>().is_ok());
        assert!(matches!(
            registry.try_get_or_create::<Motion>(),
            Err(DatabaseError::UndeclaredSchema { .. })
        ));
        assert!(registry.get::<Motion>().is_none());
        assert!(!registry.contains::<Motion>());
    }

    #[test]
    fn test_component_counts() {
        let db = Database::new();
        let mut registry = ComponentSetRegistry::new();
        registry.get_or_create::<Motion>().lock().add_component(db.create());
        registry.get_or_create::<Health>();

        let counts = registry.component_counts();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.iter().filter_map(|(_, n)| *n).sum::<usize>(), 1);

        // a set locked elsewhere is reported without blocking
        let motion = registry.get::<Motion>().unwrap();
        let held = motion.lock();
        let motion_id = registry.schema_id::<Motion>().unwrap();
        let counts = registry.component_counts();
        assert!(counts.contains(&(motion_id, None)));
        drop(held);
    }

    #[test]
    fn test_erased_handle_reaches_same_set() {
        let db = Database::new();
        let mut registry = ComponentSetRegistry::new();
        let motion = registry.get_or_create::<Motion>();
        motion.lock().add_component(db.create());

        let id = registry.schema_id::<Motion>().unwrap();
        let erased = registry.get_erased(id).unwrap();
        let erased = erased.lock();
        assert_eq!(erased.component_count(), 1);
        assert!(erased.as_any().downcast_ref::<Motion>().is_some());
    }
}
