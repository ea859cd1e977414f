//! # Column Store
//!
//! Structure-of-arrays storage for a row type made of several columns.
//!
//! A row is a tuple of column values; its store is a tuple of `Vec`s, one per
//! column:
//!
//! ```text
//! Row:     (Position, Velocity, Mass)
//! Columns: (Vec<Position>, Vec<Velocity>, Vec<Mass>)
//!
//! row 0   row 1   row 2   ...
//! [P0]    [P1]    [P2]        <- contiguous
//! [V0]    [V1]    [V2]        <- contiguous
//! [M0]    [M1]    [M2]        <- contiguous
//! ```
//!
//! Every row-level operation (push, pop, swap, swap-remove) is applied to
//! each column at the same position, so moving a row is the same as moving
//! each of its column elements independently. Push/pop are O(1) amortized.
//!
//! [`Row`] is implemented for tuples of 1 to 8 column types.

/// Row number inside a component store. `0` means "no component".
pub type Instance = u32;

/// A tuple of column values with an associated structure-of-arrays store.
///
/// All operations are associated functions on the store so that the row
/// type itself stays a plain tuple.
pub trait Row: Default + Send + Sized + 'static {
    /// The store: one `Vec` per column.
    type Columns: Default + Send + 'static;

    /// Shared slices of every column.
    type Slices<'a>
    where
        Self: 'a;

    /// Mutable slices of every column.
    type SlicesMut<'a>
    where
        Self: 'a;

    /// Shared references to every column element of one row.
    type Ref<'a>
    where
        Self: 'a;

    /// Mutable references to every column element of one row.
    type RefMut<'a>
    where
        Self: 'a;

    /// Number of columns.
    const WIDTH: usize;

    /// Number of rows.
    fn len(columns: &Self::Columns) -> usize;

    /// Appends a row.
    fn push(columns: &mut Self::Columns, row: Self);

    /// Removes and returns the last row.
    fn pop(columns: &mut Self::Columns) -> Option<Self>;

    /// Overwrites the row at `index`, returning the previous values.
    fn replace(columns: &mut Self::Columns, index: usize, row: Self) -> Self;

    /// Exchanges two rows across every column.
    fn swap(columns: &mut Self::Columns, a: usize, b: usize);

    /// Moves the last row into `index` across every column and shrinks by one.
    ///
    /// Returns the values that were at `index`.
    fn swap_remove(columns: &mut Self::Columns, index: usize) -> Self;

    /// Shortens every column to `len` rows.
    fn truncate(columns: &mut Self::Columns, len: usize);

    /// Reserves room for `additional` rows in every column.
    fn reserve(columns: &mut Self::Columns, additional: usize);

    /// References to the row at `index`.
    fn get(columns: &Self::Columns, index: usize) -> Self::Ref<'_>;

    /// Mutable references to the row at `index`.
    fn get_mut(columns: &mut Self::Columns, index: usize) -> Self::RefMut<'_>;

    /// Every column, starting at row `start`.
    fn slices(columns: &Self::Columns, start: usize) -> Self::Slices<'_>;

    /// Every column, mutably, starting at row `start`.
    fn slices_mut(columns: &mut Self::Columns, start: usize) -> Self::SlicesMut<'_>;
}

macro_rules! impl_row {
    ($width:expr; $($column:ident $index:tt),+) => {
        impl<$($column),+> Row for ($($column,)+)
        where
            $($column: Default + Send + 'static,)+
        {
            type Columns = ($(Vec<$column>,)+);
            type Slices<'a> = ($(&'a [$column],)+) where Self: 'a;
            type SlicesMut<'a> = ($(&'a mut [$column],)+) where Self: 'a;
            type Ref<'a> = ($(&'a $column,)+) where Self: 'a;
            type RefMut<'a> = ($(&'a mut $column,)+) where Self: 'a;

            const WIDTH: usize = $width;

            #[inline]
            fn len(columns: &Self::Columns) -> usize {
                columns.0.len()
            }

            #[inline]
            fn push(columns: &mut Self::Columns, row: Self) {
                $(columns.$index.push(row.$index);)+
            }

            #[inline]
            fn pop(columns: &mut Self::Columns) -> Option<Self> {
                if columns.0.is_empty() {
                    return None;
                }
                Some(($(columns.$index.pop()?,)+))
            }

            #[inline]
            fn replace(columns: &mut Self::Columns, index: usize, row: Self) -> Self {
                ($(std::mem::replace(&mut columns.$index[index], row.$index),)+)
            }

            #[inline]
            fn swap(columns: &mut Self::Columns, a: usize, b: usize) {
                $(columns.$index.swap(a, b);)+
            }

            #[inline]
            fn swap_remove(columns: &mut Self::Columns, index: usize) -> Self {
                ($(columns.$index.swap_remove(index),)+)
            }

            #[inline]
            fn truncate(columns: &mut Self::Columns, len: usize) {
                $(columns.$index.truncate(len);)+
            }

            #[inline]
            fn reserve(columns: &mut Self::Columns, additional: usize) {
                $(columns.$index.reserve(additional);)+
            }

            #[inline]
            fn get(columns: &Self::Columns, index: usize) -> Self::Ref<'_> {
                ($(&columns.$index[index],)+)
            }

            #[inline]
            fn get_mut(columns: &mut Self::Columns, index: usize) -> Self::RefMut<'_> {
                ($(&mut columns.$index[index],)+)
            }

            #[inline]
            fn slices(columns: &Self::Columns, start: usize) -> Self::Slices<'_> {
                ($(&columns.$index[start..],)+)
            }

            #[inline]
            fn slices_mut(columns: &mut Self::Columns, start: usize) -> Self::SlicesMut<'_> {
                ($(&mut columns.$index[start..],)+)
            }
        }
    };
}

impl_row!(1; A 0);
impl_row!(2; A 0, B 1);
impl_row!(3; A 0, B 1, C 2);
impl_row!(4; A 0, B 1, C 2, D 3);
impl_row!(5; A 0, B 1, C 2, D 3, E 4);
impl_row!(6; A 0, B 1, C 2, D 3, E 4, F 5);
impl_row!(7; A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_row!(8; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);
