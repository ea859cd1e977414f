//! # Dense Component Set
//!
//! Components owned by arbitrary objects that remember their own row.
//!
//! ```text
//! owner A.back_index = 1 ─┐
//! owner C.back_index = 2 ─┼─> row   0      1     2     3
//! owner B.back_index = 3 ─┘   cols [def]  [A]   [C]   [B]
//!                             owner [--]  [A]   [C]   [B]
//! ```
//!
//! No map: the owner's [`BackIndex`] is the lookup. Removal moves the last
//! row into the hole (swap-with-last) and patches the moved owner's
//! back-index, so live rows always occupy `[1, count]` with no gaps.
//!
//! There is no internal locking. One writer at a time.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::columns::{Instance, Row};
use super::registry::ComponentSet;

/// Row number stored inside an owner object.
///
/// `0` means the owner has no component. Only a [`DenseComponentSet`]
/// writes it.
#[derive(Debug, Default)]
pub struct BackIndex(AtomicU32);

impl BackIndex {
    /// A back-index pointing nowhere.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Current row, or `0`.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Instance {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    fn set(&self, instance: Instance) {
        self.0.store(instance, Ordering::Relaxed);
    }
}

/// An object that can own a row in a [`DenseComponentSet`].
///
/// `S` is a tag naming the set. An owner that lives in one kind of set
/// implements `Indexable` with the default tag; an owner that can be in
/// several sets carries one back-index per tag, and each set only ever
/// touches the back-index of its own tag.
///
/// ```rust,ignore
/// struct Trails;
/// struct Glows;
///
/// struct Particle {
///     trail: BackIndex,
///     glow: BackIndex,
/// }
///
/// impl Indexable<Trails> for Particle {
///     fn back_index(&self) -> &BackIndex {
///         &self.trail
///     }
/// }
///
/// impl Indexable<Glows> for Particle {
///     fn back_index(&self) -> &BackIndex {
///         &self.glow
///     }
/// }
///
/// let trails: DenseComponentSet<(Color,), Particle, Trails> = DenseComponentSet::new();
/// let glows: DenseComponentSet<(f32,), Particle, Glows> = DenseComponentSet::new();
/// ```
pub trait Indexable<S = ()>: Send + Sync + 'static {
    /// The back-index used by sets tagged `S`.
    fn back_index(&self) -> &BackIndex;
}

/// Self-indexed, always-compact component storage.
///
/// Two sets with the same tag `S` must not share an owner.
pub struct DenseComponentSet<R: Row, O: Indexable<S>, S: 'static = ()> {
    columns: R::Columns,
    /// Trailing owner column. `None` only for row 0.
    owners: Vec<Option<Arc<O>>>,
    tag: PhantomData<fn() -> S>,
}

impl<R: Row, O: Indexable<S>, S: 'static> DenseComponentSet<R, O, S> {
    /// Creates an empty set holding only the reserved row 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty set with room for `capacity` components.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut columns = R::Columns::default();
        R::reserve(&mut columns, capacity + 1);
        R::push(&mut columns, R::default());

        let mut owners = Vec::with_capacity(capacity + 1);
        owners.push(None);

        Self {
            columns,
            owners,
            tag: PhantomData,
        }
    }

    /// Returns `true` if `owner` has a component in this set.
    #[inline]
    #[must_use]
    pub fn has_component(&self, owner: &O) -> bool {
        self.instance(owner) != 0
    }

    /// Row of `owner`, or `0`.
    #[inline]
    #[must_use]
    pub fn instance(&self, owner: &O) -> Instance {
        Self::slot(owner).get()
    }

    #[inline]
    fn slot(owner: &O) -> &BackIndex {
        <O as Indexable<S>>::back_index(owner)
    }

    /// Number of components.
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.owners.len() - 1
    }

    /// Whether the set is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.component_count() == 0
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

    /// Owner of a row. `None` for row 0 or out-of-range rows.
    #[inline]
    #[must_use]
    pub fn owner(&self, instance: Instance) -> Option<&Arc<O>> {
        self.owners.get(instance as usize)?.as_ref()
    }

    /// Owners in row order.
    pub fn owners(&self) -> impl Iterator<Item = &Arc<O>> + '_ {
        self.owners.iter().skip(1).flatten()
    }

    /// Live `(owner, row)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<O>, Instance)> + '_ {
        self.owners().zip(1..)
    }

    fn is_owned_by(&self, row: usize, owner: &O) -> bool {
        self.owners
            .get(row)
            .and_then(Option::as_ref)
            .is_some_and(|stored| std::ptr::eq(Arc::as_ptr(stored), owner))
    }

    /// Adds a component to `owner`, returning its row.
    ///
    /// Returns the existing row if `owner` already has one. Invalidates
    /// previously obtained slices.
    pub fn add_component(&mut self, owner: &Arc<O>) -> Instance {
        let existing = Self::slot(owner).get();
        if existing != 0 {
            debug_assert!(
                self.is_owned_by(existing as usize, owner),
                "owner's back-index points into a different set"
            );
            return existing;
        }

        R::push(&mut self.columns, R::default());
        self.owners.push(Some(Arc::clone(owner)));
        let instance = (self.owners.len() - 1) as Instance;
        Self::slot(owner).set(instance);
        instance
    }

    /// Adds a component to `owner` (if needed) and writes `row` into it.
    pub fn insert(&mut self, owner: &Arc<O>, row: R) -> Instance {
        let instance = self.add_component(owner);
        R::replace(&mut self.columns, instance as usize, row);
        instance
    }

    /// Removes the component of `owner`.
    ///
    /// The last row moves into the freed slot and its owner's back-index is
    /// updated; `owner`'s back-index is reset to `0`. Returns the former last
    /// row number, or `0` if `owner` had no component.
    pub fn remove_component(&mut self, owner: &O) -> Instance {
        let index = Self::slot(owner).get() as usize;
        if index == 0 {
            return 0;
        }
        let owned = self.is_owned_by(index, owner);
        debug_assert!(owned, "owner's back-index {index} does not belong to this set");
        if !owned {
            return 0;
        }

        let last = self.owners.len() - 1;
        R::swap_remove(&mut self.columns, index);
        self.owners.swap_remove(index);
        if index != last {
            if let Some(moved) = &self.owners[index] {
                Self::slot(moved).set(index as Instance);
            }
        }
        Self::slot(owner).set(0);
        last as Instance
    }

    /// Exchanges two rows across every column and patches both back-indices.
    ///
    /// # Panics
    ///
    /// Panics if either row is 0 or out of range.
    pub fn swap(&mut self, i: Instance, j: Instance) {
        assert!(i != 0 && j != 0, "row 0 is reserved and cannot be swapped");
        R::swap(&mut self.columns, i as usize, j as usize);
        self.owners.swap(i as usize, j as usize);
        for row in [i, j] {
            if let Some(owner) = &self.owners[row as usize] {
                Self::slot(owner).set(row);
            }
        }
    }

    /// Removes every component and resets every owner's back-index.
    pub fn clear(&mut self) {
        for owner in self.owners.drain(1..).flatten() {
            Self::slot(&owner).set(0);
        }
        R::truncate(&mut self.columns, 1);
    }

    /// Column values of `owner`'s component.
    #[inline]
    #[must_use]
    pub fn get(&self, owner: &O) -> Option<R::Ref<'_>> {
        match self.instance(owner) {
            0 => None,
            instance => Some(R::get(&self.columns, instance as usize)),
        }
    }

    /// Mutable column values of `owner`'s component.
    #[inline]
    pub fn get_mut(&mut self, owner: &O) -> Option<R::RefMut<'_>> {
        match self.instance(owner) {
            0 => None,
            instance => Some(R::get_mut(&mut self.columns, instance as usize)),
        }
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

    /// Every column as a slice starting at row 1. No gaps.
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
}

impl<R: Row, O: Indexable<S>, S: 'static> Default for DenseComponentSet<R, O, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Row, O: Indexable<S>, S: 'static> Drop for DenseComponentSet<R, O, S> {
    fn drop(&mut self) {
        for owner in self.owners.iter().flatten() {
            Self::slot(owner).set(0);
        }
    }
}

impl<R: Row, O: Indexable<S>, S: 'static> ComponentSet for DenseComponentSet<R, O, S> {
    fn component_count(&self) -> usize {
        DenseComponentSet::component_count(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Body {
        name: u32,
        slot: BackIndex,
    }

    impl Indexable for Body {
        fn back_index(&self) -> &BackIndex {
            &self.slot
        }
    }

    type Bodies = DenseComponentSet<(f32, u32), Body>;

    fn bodies(n: u32) -> Vec<Arc<Body>> {
        (0..n)
            .map(|name| {
                Arc::new(Body {
                    name,
                    slot: BackIndex::new(),
                })
            })
            .collect()
    }

    fn assert_contiguous(set: &Bodies) {
        for (owner, instance) in set.iter() {
            assert_eq!(owner.back_index().get(), instance);
            let (_, name) = set.row(instance);
            assert_eq!(*name, owner.name);
        }
        assert_eq!(set.iter().count(), set.component_count());
        assert_eq!(set.end() as usize, set.component_count() + 1);
    }

    #[test]
    fn test_add_sets_back_index() {
        let mut set = Bodies::new();
        let owners = bodies(2);

        assert_eq!(set.add_component(&owners[0]), 1);
        assert_eq!(set.add_component(&owners[1]), 2);
        assert_eq!(owners[0].back_index().get(), 1);
        assert_eq!(owners[1].back_index().get(), 2);
        assert!(set.has_component(&owners[1]));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut set = Bodies::new();
        let owners = bodies(1);

        let first = set.add_component(&owners[0]);
        let second = set.add_component(&owners[0]);
        assert_eq!(first, second);
        assert_eq!(set.component_count(), 1);
    }

    #[test]
    fn test_remove_middle_keeps_rows_contiguous() {
        let mut set = Bodies::new();
        let owners = bodies(5);
        for owner in &owners {
            set.insert(owner, (owner.name as f32, owner.name));
        }

        let returned = set.remove_component(&owners[1]);

        assert_eq!(returned, 5);
        assert_eq!(set.component_count(), 4);
        assert_eq!(owners[1].back_index().get(), 0);
        // the last owner moved into the hole
        assert_eq!(owners[4].back_index().get(), 2);
        assert_contiguous(&set);

        let (_, names) = set.columns();
        assert_eq!(names, &[0, 4, 2, 3]);
    }

    #[test]
    fn test_remove_last_row() {
        let mut set = Bodies::new();
        let owners = bodies(3);
        for owner in &owners {
            set.insert(owner, (0.0, owner.name));
        }

        assert_eq!(set.remove_component(&owners[2]), 3);
        assert_eq!(set.component_count(), 2);
        assert_eq!(owners[0].back_index().get(), 1);
        assert_eq!(owners[1].back_index().get(), 2);
        assert_contiguous(&set);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut set = Bodies::new();
        let owners = bodies(1);
        assert_eq!(set.remove_component(&owners[0]), 0);
    }

    #[test]
    fn test_readd_after_remove() {
        let mut set = Bodies::new();
        let owners = bodies(2);
        for owner in &owners {
            set.insert(owner, (0.0, owner.name));
        }
        set.remove_component(&owners[0]);

        assert_eq!(set.insert(&owners[0], (0.0, owners[0].name)), 2);
        assert_contiguous(&set);
        let (_, names) = set.columns();
        assert_eq!(names, &[1, 0]);
    }

    #[test]
    fn test_swap_patches_back_indices() {
        let mut set = Bodies::new();
        let owners = bodies(3);
        for owner in &owners {
            set.insert(owner, (0.0, owner.name));
        }

        set.swap(1, 3);

        assert_eq!(owners[0].back_index().get(), 3);
        assert_eq!(owners[2].back_index().get(), 1);
        assert_contiguous(&set);
    }

    #[test]
    fn test_get_mut_and_columns() {
        let mut set = Bodies::new();
        let owners = bodies(2);
        set.insert(&owners[0], (1.0, 0));
        set.insert(&owners[1], (2.0, 1));

        if let Some((speed, _)) = set.get_mut(&owners[1]) {
            *speed = 5.0;
        }
        {
            let (speeds, _) = set.columns_mut();
            speeds.iter_mut().for_each(|s| *s += 1.0);
        }

        assert_eq!(set.get(&owners[0]), Some((&2.0, &0)));
        assert_eq!(set.get(&owners[1]), Some((&6.0, &1)));
        let (raw, _) = set.raw_columns();
        assert_eq!(raw[0], 0.0);
    }

    #[test]
    fn test_clear_and_drop_reset_owners() {
        let owners = bodies(2);
        {
            let mut set = Bodies::new();
            set.add_component(&owners[0]);
            set.clear();
            assert!(set.is_empty());
            assert_eq!(owners[0].back_index().get(), 0);

            set.add_component(&owners[1]);
            assert_eq!(owners[1].back_index().get(), 1);
        }
        assert_eq!(owners[1].back_index().get(), 0);
    }

    #[test]
    fn test_owner_lookup() {
        let mut set = Bodies::new();
        let owners = bodies(2);
        set.add_component(&owners[0]);
        set.add_component(&owners[1]);

        assert!(set.owner(0).is_none());
        assert!(Arc::ptr_eq(set.owner(2).unwrap(), &owners[1]));
        let names: Vec<u32> = set.owners().map(|o| o.name).collect();
        assert_eq!(names, vec![0, 1]);
    }

    struct Trails;
    struct Glows;

    #[derive(Default)]
    struct Spark {
        trail: BackIndex,
        glow: BackIndex,
    }

    impl Indexable<Trails> for Spark {
        fn back_index(&self) -> &BackIndex {
            &self.trail
        }
    }

    impl Indexable<Glows> for Spark {
        fn back_index(&self) -> &BackIndex {
            &self.glow
        }
    }

    #[test]
    fn test_owner_in_two_tagged_sets() {
        let mut trails: DenseComponentSet<(u8,), Spark, Trails> = DenseComponentSet::new();
        let mut glows: DenseComponentSet<(f32,), Spark, Glows> = DenseComponentSet::new();
        let sparks: Vec<Arc<Spark>> = (0..3).map(|_| Arc::new(Spark::default())).collect();

        for spark in &sparks {
            trails.insert(spark, (7,));
        }
        glows.insert(&sparks[2], (0.5,));

        assert_eq!(sparks[2].trail.get(), 3);
        assert_eq!(sparks[2].glow.get(), 1);
        assert_eq!(glows.get(&sparks[2]), Some((&0.5,)));
        assert!(!glows.has_component(&sparks[0]));

        // moving sparks[2] in one set leaves its row in the other alone
        trails.remove_component(&sparks[0]);
        assert_eq!(sparks[2].trail.get(), 1);
        assert_eq!(sparks[2].glow.get(), 1);
        assert_eq!(glows.remove_component(&sparks[2]), 1);
        assert_eq!(trails.instance(&sparks[2]), 1);
    }
}
