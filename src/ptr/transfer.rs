//! `TransferHandle` — ownership that moves instead of being duplicated.
//!
//! Rust moves already transfer ownership, so a plain `let b = a;` behaves as
//! expected. What this type adds is the *in-place* form: [`TransferHandle::take`] and
//! [`TransferHandle::assign_from`] move the value out of a handle the caller only
//! borrows, leaving that handle empty. Loaders return their fresh resource through
//! one of these, so at no point can two owners of the result exist.
//!
//! `TransferHandle` deliberately implements neither `Clone` nor `PartialEq`:
//! each instance is a unique owner and comparing two of them is meaningless.

use super::cell::{Disposal, OwnershipCell};
use super::exclusive::ExclusiveHandle;
use crate::error::contract_violation;
use core::fmt;
use core::ops::{Deref, DerefMut};

/// Ownership of zero or one value, transferred (never copied) on assignment.
///
/// # Examples
///
/// ```
/// use hoard::ptr::TransferHandle;
///
/// let mut source = TransferHandle::new(vec![0u8; 16]);
/// let target = source.take();
///
/// assert!(!source.is_valid());
/// assert_eq!(target.len(), 16);
/// ```
pub struct TransferHandle<T: ?Sized> {
    cell: OwnershipCell<T>,
}

impl<T> TransferHandle<T> {
    /// Takes ownership of `value`.
    pub fn new(value: T) -> Self {
        Self {
            cell: OwnershipCell::new(value),
        }
    }

    /// Destroys the current value and takes ownership of `value`.
    pub fn reset_with(&mut self, value: T) {
        self.reset_with_box(Box::new(value));
    }
}

impl<T: ?Sized> TransferHandle<T> {
    /// Creates an empty handle.
    pub const fn empty() -> Self {
        Self {
            cell: OwnershipCell::empty(),
        }
    }

    /// Takes ownership of an already boxed value.
    pub fn from_box(value: Box<T>) -> Self {
        Self {
            cell: OwnershipCell::from_box(value),
        }
    }

    /// Takes ownership of `value`, destroying it through `disposal`.
    pub fn with_disposal(value: Box<T>, disposal: Disposal<T>) -> Self {
        Self {
            cell: OwnershipCell::with_disposal(value, disposal),
        }
    }

    pub(crate) fn into_cell(self) -> OwnershipCell<T> {
        self.cell
    }

    /// Moves the owned value into a new handle, leaving `self` empty.
    pub fn take(&mut self) -> Self {
        let mut taken = Self::empty();
        taken.cell.swap(&mut self.cell);
        taken
    }

    /// Moves the value out of `source` into `self`, leaving `source` empty.
    ///
    /// Whatever `self` held before is destroyed. Assigning a handle from itself is
    /// impossible by construction, since `source` is borrowed mutably.
    pub fn assign_from(&mut self, source: &mut Self) {
        let mut incoming = source.take();
        self.cell.swap(&mut incoming.cell);
        // `incoming` now holds the previous value and destroys it here.
    }

    /// Returns `true` if the handle owns a value.
    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.cell.is_empty()
    }

    /// Returns a reference to the owned value, or `None` if empty.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Returns a mutable reference to the owned value, or `None` if empty.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.cell.get_mut()
    }

    /// Exchanges contents with `other`.
    pub fn swap(&mut self, other: &mut Self) {
        self.cell.swap(&mut other.cell);
    }

    /// Destroys the owned value, leaving the handle empty.
    pub fn reset(&mut self) {
        self.cell.reset();
    }

    /// Destroys the current value and takes ownership of an already boxed one.
    pub fn reset_with_box(&mut self, value: Box<T>) {
        let mut incoming = OwnershipCell::from_box(value);
        self.cell.swap(&mut incoming);
    }

    /// Gives up ownership without destroying the value.
    pub fn release(&mut self) -> Option<Box<T>> {
        self.cell.release()
    }

    /// Consumes the handle, returning the owned value if any.
    pub fn into_box(mut self) -> Option<Box<T>> {
        self.release()
    }
}

impl<T: ?Sized> Deref for TransferHandle<T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.cell.get() {
            Some(value) => value,
            None => contract_violation("dereferenced an empty TransferHandle"),
        }
    }
}

impl<T: ?Sized> DerefMut for TransferHandle<T> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        match self.cell.get_mut() {
            Some(value) => value,
            None => contract_violation("dereferenced an empty TransferHandle"),
        }
    }
}

impl<T: ?Sized> Default for TransferHandle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> From<Box<T>> for TransferHandle<T> {
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T: ?Sized> From<ExclusiveHandle<T>> for TransferHandle<T> {
    fn from(handle: ExclusiveHandle<T>) -> Self {
        Self {
            cell: handle.into_cell(),
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for TransferHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TransferHandle").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Tracked(Rc<Cell<usize>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let drops = Rc::new(Cell::new(0));
        let mut a = TransferHandle::new(Tracked(drops.clone()));
        let b = a.take();

        assert!(!a.is_valid());
        assert!(b.is_valid());

        drop(a);
        assert_eq!(drops.get(), 0);
        drop(b);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_assign_from_destroys_previous_target() {
        let drops = Rc::new(Cell::new(0));
        let mut a = TransferHandle::new(Tracked(drops.clone()));
        let mut b = TransferHandle::new(Tracked(drops.clone()));

        b.assign_from(&mut a);
        assert_eq!(drops.get(), 1);
        assert!(!a.is_valid());
        assert!(b.is_valid());

        drop(a);
        drop(b);
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn test_take_from_empty_is_empty() {
        let mut a: TransferHandle<u8> = TransferHandle::empty();
        let b = a.take();
        assert!(!a.is_valid());
        assert!(!b.is_valid());
    }

    #[test]
    fn test_custom_disposal_survives_transfer() {
        let disposed = Rc::new(Cell::new(false));
        let flag = disposed.clone();
        let mut a = TransferHandle::with_disposal(
            Box::new(3u8),
            Disposal::custom(move |_| flag.set(true)),
        );

        let b = ExclusiveHandle::from(a.take());
        drop(a);
        assert!(!disposed.get());
        drop(b);
        assert!(disposed.get());
    }

    #[test]
    fn test_round_trip_through_exclusive() {
        let exclusive = ExclusiveHandle::new(5);
        let transfer = TransferHandle::from(exclusive);
        assert_eq!(*transfer, 5);
    }

    #[test]
    #[should_panic(expected = "dereferenced an empty TransferHandle")]
    fn test_deref_after_take_panics() {
        let mut a = TransferHandle::new(1);
        let _b = a.take();
        let _value: i32 = *a;
    }
}
