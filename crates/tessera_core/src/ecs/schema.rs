//! # Schema Ids
//!
//! Every component-set type gets a small integer id. Two ways to assign it:
//!
//! - **Process-wide, lazy**: [`schema_id_of`] hands out the next id the first
//!   time any caller in the process asks about a type. Ids depend on
//!   first-use order and live until the process exits.
//! - **Declared, deterministic**: a [`SchemaTable`] built at startup assigns
//!   ids in declaration order. The same declaration list always yields the
//!   same ids, independent of which module touches a type first.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use parking_lot::Mutex;

/// Identifier of a component-set type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(u32);

impl SchemaId {
    /// Raw integer value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn process_ids() -> &'static Mutex<HashMap<TypeId, SchemaId>> {
    static IDS: OnceLock<Mutex<HashMap<TypeId, SchemaId>>> = OnceLock::new();
    IDS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Process-wide id of `T`, assigned on first use.
///
/// Ids count up from 0 and are never reused.
#[must_use]
pub fn schema_id_of<T: 'static>() -> SchemaId {
    let mut ids = process_ids().lock();
    let next = SchemaId(ids.len() as u32);
    *ids.entry(TypeId::of::<T>()).or_insert_with(|| {
        tracing::debug!(schema = next.0, type_name = type_name::<T>(), "assigned schema id");
        next
    })
}

/// Fixed mapping from component-set types to ids, built once at startup.
///
/// ```rust,ignore
/// let table = SchemaTable::builder()
///     .declare::<Transforms>()
///     .declare::<Particles>()
///     .build();
/// let db = Database::with_schemas(DatabaseConfig::default(), table)?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct SchemaTable {
    ids: HashMap<TypeId, SchemaId>,
    names: Vec<&'static str>,
}

impl SchemaTable {
    /// Starts an empty declaration list.
    #[must_use]
    pub fn builder() -> SchemaTableBuilder {
        SchemaTableBuilder::default()
    }

    /// Id of `T`, if declared.
    #[must_use]
    pub fn id_of<T: 'static>(&self) -> Option<SchemaId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Type name declared under `id`.
    #[must_use]
    pub fn name(&self, id: SchemaId) -> Option<&'static str> {
        self.names.get(id.0 as usize).copied()
    }

    /// Number of declared types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Builder for [`SchemaTable`].
#[derive(Debug, Default)]
pub struct SchemaTableBuilder {
    table: SchemaTable,
}

impl SchemaTableBuilder {
    /// Declares `T`, giving it the next id. Repeated declarations keep the first id.
    #[must_use]
    pub fn declare<T: 'static>(mut self) -> Self {
        let next = SchemaId(self.table.names.len() as u32);
        let name = type_name::<T>();
        match self.table.ids.entry(TypeId::of::<T>()) {
            std::collections::hash_map::Entry::Occupied(_) => {
                tracing::warn!(type_name = name, "schema declared twice, keeping first id");
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(next);
                self.table.names.push(name);
            }
        }
        self
    }

    /// Finishes the table.
    #[must_use]
    pub fn build(self) -> SchemaTable {
        self.table
    }
}
