//! # Tessera Core
//!
//! Generational entity database with structure-of-arrays component storage:
//! - Up to ~16.7M live entities behind packed 32-bit handles
//! - Lock-free liveness checks from any thread
//! - Batched destruction notifications for dependent stores
//!
//! ## Architecture Rules
//!
//! 1. **Handles are values** - An [`Entity`] is a `Copy` integer, never a pointer
//! 2. **Data-oriented design** - Component columns are contiguous arrays
//! 3. **Exclusive stores** - Component sets are mutated by one owner at a time
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{Database, SparseComponentManager};
//!
//! type Motion = SparseComponentManager<(Position, Velocity)>;
//!
//! let db = Database::new();
//! let e = db.create();
//! db.component_set_or_create::<Motion>()
//!     .lock()
//!     .insert(e, (Position::ZERO, Velocity::ZERO));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::DatabaseConfig;
pub use ecs::{
    ComponentSet, ComponentSetRegistry, Database, DenseComponentSet, DestroyedBatch,
    DestroyedQueue, Entity, EntityListener, Indexable, Instance, Row, SchemaId, SchemaTable,
    SetHandle, SparseComponentManager,
};
pub use error::{DatabaseError, DatabaseResult};
