//! # Entity Database and Component Storage
//!
//! Generational entity handles plus two column-oriented component stores.
//!
//! ## Design Philosophy
//!
//! - Entities are packed `u32` handles; staleness is detected by generation
//! - Components live in parallel column arrays, one row per owner
//! - Row 0 of every store is a reserved sentinel
//! - Component sets are plain structs, type-erased and locked only at the registry

mod columns;
mod database;
mod dense;
mod entity;
pub(crate) mod generation;
mod listener;
mod manager;
mod registry;
mod schema;

pub use columns::{Instance, Row};
pub use database::Database;
pub use dense::{BackIndex, DenseComponentSet, Indexable};
pub use entity::{
    as_raw, Entity, GENERATION_BITS, INDEX_BITS, INDEX_MASK, MAX_ENTITY_COUNT, RAW_INDEX_COUNT,
};
pub use listener::{DestroyedBatch, DestroyedQueue, EntityListener};
pub use manager::SparseComponentManager;
pub use registry::{ComponentSet, ComponentSetRegistry, ErasedSetHandle, SetHandle};
pub use schema::{schema_id_of, SchemaId, SchemaTable, SchemaTableBuilder};
