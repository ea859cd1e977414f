//! # Sparse Component Manager
//!
//! Associates arbitrary entities with rows of a column store through a hash
//! map.
//!
//! ```text
//! instances: { e7 -> 1, e2 -> 3 }
//!
//! row      0       1       2       3
//! cols   [def]   [ .. ]  [def]   [ .. ]
//! owner  [null]  [ e7 ]  [null]  [ e2 ]
//!                         ^ vacant (on the free list)
//! ```
//!
//! Row 0 is a permanently reserved default row, so instance `0` can mean
//! "no component" everywhere. Removing a component does not move other rows:
//! the row is reset to its default values, its owner becomes the null entity
//! (a tombstone) and its number goes on a free list for the next
//! `add_component`. [`SparseComponentManager::iter`] skips tombstones; raw
//! column slices do not. Call [`SparseComponentManager::compact`] to close
//! the holes.
//!
//! There is no internal locking. One writer at a time.

use std::any::Any;
use std::collections::HashMap;
use std::ops::Range;

use super::columns::{Instance, Row};
use super::database::Database;
use super::entity::Entity;
use super::registry::ComponentSet;

/// Hash-indexed component storage for entities.
///
/// # Example
///
/// ```rust,ignore
/// let db = Database::new();
/// let mut motion: SparseComponentManager<(Position, Velocity)> = SparseComponentManager::new();
///
/// let e = db.create();
/// let i = motion.add_component(e);
/// let (pos, vel) = motion.row_mut(i);
///
/// // Per-frame hot path: plain slices
/// let (positions, velocities) = motion.columns_mut();
/// ```
pub struct SparseComponentManager<R: Row> {
    columns: R::Columns,
    /// Trailing owner column. Null for row 0 and for vacant rows.
    owners: Vec<Entity>,
    instances: HashMap<Entity, Instance>,
    free_rows: Vec<Instance>,
}

impl<R: Row> SparseComponentManager<R> {
    /// Creates an empty manager holding only the reserved row 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty manager with room for `capacity` components.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut columns = R::Columns::default();
        R::reserve(&mut columns, capacity + 1);
        R::push(&mut columns, R::default());

        let mut owners = Vec::with_capacity(capacity + 1);
        owners.push(Entity::NULL);

        Self {
            columns,
            owners,
            instances: HashMap::with_capacity(capacity),
            free_rows: Vec::new(),
        }
    }

    /// Returns `true` if `entity` has a component in this manager.
    #[inline]
    #[must_use]
    pub fn has_component(&self, entity: Entity) -> bool {
        self.instance(entity) != 0
    }

    /// Row of `entity`, or `0` if it has no component.
    #[inline]
    #[must_use]
    pub fn instance(&self, entity: Entity) -> Instance {
        self.instances.get(&entity).copied().unwrap_or(0)
    }

    /// Number of live components.
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.instances.len()
    }

    /// Whether there are no live components.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Number of rows after row 0, vacant rows included.
    #[inline]
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.owners.len() - 1
    }

    /// Number of vacant rows waiting to be reused.
    #[inline]
    #[must_use]
    pub fn vacant_count(&self) -> usize {
        self.free_rows.len()
    }

    /// First row number.
    #[inline]
    #[must_use]
    pub const fn begin(&self) -> Instance {
        1
    }

    /// Past-the-last row number.
    #[inline]
    #[must_use]
    pub fn end(&self) -> Instance {
        self.owners.len() as Instance
    }

    /// Every row number after row 0, vacant rows included.
    #[inline]
    #[must_use]
    pub fn instances(&self) -> Range<Instance> {
        self.begin()..self.end()
    }

    /// Owner of a row. Null for vacant rows.
    ///
    /// # Panics
    ///
    /// Panics if `instance` is out of range.
    #[inline]
    #[must_use]
    pub fn entity(&self, instance: Instance) -> Entity {
        self.owners[instance as usize]
    }

    /// Owner column, starting at row 1.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.owners[1..]
    }

    /// Adds a component to `entity`, returning its row.
    ///
    /// Returns the existing row if `entity` already has one, and `0` for the
    /// null entity. Invalidates previously obtained slices.
    pub fn add_component(&mut self, entity: Entity) -> Instance {
        if entity.is_null() {
            return 0;
        }
        if let Some(&existing) = self.instances.get(&entity) {
            return existing;
        }

        let instance = if let Some(row) = self.free_rows.pop() {
            // vacant rows are writable through `columns_mut`
            R::replace(&mut self.columns, row as usize, R::default());
            self.owners[row as usize] = entity;
            row
        } else {
            R::push(&mut self.columns, R::default());
            self.owners.push(entity);
            (self.owners.len() - 1) as Instance
        };

        self.instances.insert(entity, instance);
        instance
    }

    /// Adds a component to `entity` (if needed) and writes `row` into it.
    ///
    /// Returns `0` and drops `row` for the null entity.
    pub fn insert(&mut self, entity: Entity, row: R) -> Instance {
        let instance = self.add_component(entity);
        if instance != 0 {
            R::replace(&mut self.columns, instance as usize, row);
        }
        instance
    }

    /// Removes the component of `entity`, returning the freed row.
    ///
    /// Returns `0` if `entity` had no component. Other rows do not move.
    pub fn remove_component(&mut self, entity: Entity) -> Instance {
        let Some(instance) = self.instances.remove(&entity) else {
            return 0;
        };
        debug_assert_ne!(instance, 0);

        let row = instance as usize;
        R::replace(&mut self.columns, row, R::default());
        self.owners[row] = Entity::NULL;
        self.free_rows.push(instance);
        instance
    }

    /// Removes the components of every entity in `entities`.
    ///
    /// Returns how many components were removed.
    pub fn remove_components(&mut self, entities: &[Entity]) -> usize {
        entities
            .iter()
            .filter(|&&entity| self.remove_component(entity) != 0)
            .count()
    }

    /// Removes the components of entities that are no longer alive in `db`.
    ///
    /// Returns how many components were removed.
    pub fn retain_alive(&mut self, db: &Database) -> usize {
        let dead: Vec<Entity> = self
            .instances
            .keys()
            .copied()
            .filter(|&entity| !db.is_alive(entity))
            .collect();
        let removed = self.remove_components(&dead);
        if removed > 0 {
            tracing::debug!(removed, "dropped components of dead entities");
        }
        removed
    }

    /// Exchanges two rows across every column and fixes up the index map.
    ///
    /// Vacant rows may take part; their free-list entries follow them.
    ///
    /// # Panics
    ///
    /// Panics if either row is 0 or out of range.
    pub fn swap(&mut self, i: Instance, j: Instance) {
        assert!(i != 0 && j != 0, "row 0 is reserved and cannot be swapped");
        if i == j {
            return;
        }

        R::swap(&mut self.columns, i as usize, j as usize);
        self.owners.swap(i as usize, j as usize);

        for row in [i, j] {
            let owner = self.owners[row as usize];
            if !owner.is_null() {
                self.instances.insert(owner, row);
            }
        }

        // two vacant rows need no fixup
        let vacant_i = self.owners[i as usize].is_null();
        if vacant_i != self.owners[j as usize].is_null() {
            let (from, to) = if vacant_i { (j, i) } else { (i, j) };
            if let Some(slot) = self.free_rows.iter_mut().find(|slot| **slot == from) {
                *slot = to;
            }
        }
    }

    /// Closes the holes left by removals.
    ///
    /// Vacant rows are filled with the last live rows (swap-with-last) and
    /// trailing vacant rows are dropped, so afterwards every row in
    /// [`instances`](Self::instances) is live. Returns the number of rows
    /// reclaimed. Moved components get new row numbers.
    pub fn compact(&mut self) -> usize {
        let mut vacant = std::mem::take(&mut self.free_rows);
        vacant.sort_unstable();

        let mut reclaimed = self.drop_trailing_vacant();
        for row in vacant {
            let row = row as usize;
            if row >= self.owners.len() {
                // already dropped as a trailing row
                continue;
            }
            R::swap_remove(&mut self.columns, row);
            self.owners.swap_remove(row);
            let moved = self.owners[row];
            debug_assert!(!moved.is_null());
            self.instances.insert(moved, row as Instance);
            reclaimed += 1;
            reclaimed += self.drop_trailing_vacant();
        }

        if reclaimed > 0 {
            tracing::debug!(reclaimed, rows = self.row_count(), "compacted sparse component rows");
        }
        reclaimed
    }

    fn drop_trailing_vacant(&mut self) -> usize {
        let mut dropped = 0;
        while self.owners.len() > 1 && self.owners[self.owners.len() - 1].is_null() {
            self.owners.pop();
            R::pop(&mut self.columns);
            dropped += 1;
        }
        dropped
    }

    /// Column values of `entity`'s component.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<R::Ref<'_>> {
        let instance = self.instances.get(&entity)?;
        Some(R::get(&self.columns, *instance as usize))
    }

    /// Mutable column values of `entity`'s component.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<R::RefMut<'_>> {
        let instance = *self.instances.get(&entity)?;
        Some(R::get_mut(&mut self.columns, instance as usize))
    }

    /// Column values of a row.
    ///
    /// # Panics
    ///
    /// Panics if `instance` is out of range.
    #[inline]
    #[must_use]
    pub fn row(&self, instance: Instance) -> R::Ref<'_> {
        debug_assert_ne!(instance, 0, "row 0 is reserved");
        R::get(&self.columns, instance as usize)
    }

    /// Mutable column values of a row.
    ///
    /// # Panics
    ///
    /// Panics if `instance` is out of range.
    #[inline]
    pub fn row_mut(&mut self, instance: Instance) -> R::RefMut<'_> {
        debug_assert_ne!(instance, 0, "row 0 is reserved");
        R::get_mut(&mut self.columns, instance as usize)
    }

    /// Every column as a slice starting at row 1.
    ///
    /// Vacant rows are included and hold default values.
    #[inline]
    #[must_use]
    pub fn columns(&self) -> R::Slices<'_> {
        R::slices(&self.columns, 1)
    }

    /// Every column as a mutable slice starting at row 1.
    #[inline]
    pub fn columns_mut(&mut self) -> R::SlicesMut<'_> {
        R::slices_mut(&mut self.columns, 1)
    }

    /// Every column including the reserved row 0. Use with caution.
    #[inline]
    #[must_use]
    pub fn raw_columns(&self) -> R::Slices<'_> {
        R::slices(&self.columns, 0)
    }

    /// Live `(owner, row)` pairs in row order, skipping vacant rows.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, Instance)> + '_ {
        self.owners
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, owner)| !owner.is_null())
            .map(|(row, &owner)| (owner, row as Instance))
    }
}

impl<R: Row> Default for SparseComponentManager<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Row> ComponentSet for SparseComponentManager<R> {
    fn component_count(&self) -> usize {
        SparseComponentManager::component_count(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
