//! `ExclusiveHandle` — a non-copyable, single-owner handle.
//!
//! The value lives exactly as long as the handle, or until [`ExclusiveHandle::reset`].
//! The resource cache keeps every loaded asset in one of these.

use super::cell::{Disposal, OwnershipCell};
use super::transfer::TransferHandle;
use crate::error::contract_violation;
use core::fmt;
use core::ops::{Deref, DerefMut};

/// Deterministic exclusive ownership of zero or one value.
///
/// Dereferencing requires a non-empty handle; use [`get`](Self::get) when the handle
/// may be empty.
///
/// # Examples
///
/// ```
/// use hoard::ptr::ExclusiveHandle;
///
/// let mut handle = ExclusiveHandle::new(String::from("texture"));
/// handle.push_str("-atlas");
/// assert_eq!(&*handle, "texture-atlas");
///
/// handle.reset();
/// assert!(!handle.is_valid());
/// ```
pub struct ExclusiveHandle<T: ?Sized> {
    cell: OwnershipCell<T>,
}

impl<T> ExclusiveHandle<T> {
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

impl<T: ?Sized> ExclusiveHandle<T> {
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

    pub(crate) fn from_cell(cell: OwnershipCell<T>) -> Self {
        Self { cell }
    }

    pub(crate) fn into_cell(self) -> OwnershipCell<T> {
        self.cell
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
        // `incoming` now holds the old value and destroys it here.
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

impl<T: ?Sized> Deref for ExclusiveHandle<T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.cell.get() {
            Some(value) => value,
            None => contract_violation("dereferenced an empty ExclusiveHandle"),
        }
    }
}

impl<T: ?Sized> DerefMut for ExclusiveHandle<T> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        match self.cell.get_mut() {
            Some(value) => value,
            None => contract_violation("dereferenced an empty ExclusiveHandle"),
        }
    }
}

impl<T: ?Sized> Default for ExclusiveHandle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> From<TransferHandle<T>> for ExclusiveHandle<T> {
    /// Absorbs whatever the transfer handle held, keeping its destroy capability.
    fn from(handle: TransferHandle<T>) -> Self {
        Self::from_cell(handle.into_cell())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for ExclusiveHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExclusiveHandle").field(&self.get()).finish()
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
    fn test_reset_destroys_exactly_once() {
        let drops = Rc::new(Cell::new(0));
        let mut handle = ExclusiveHandle::new(Tracked(drops.clone()));

        handle.reset();
        assert_eq!(drops.get(), 1);
        assert!(!handle.is_valid());

        handle.reset();
        drop(handle);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_reset_with_replaces_and_destroys_old() {
        let drops = Rc::new(Cell::new(0));
        let mut handle = ExclusiveHandle::new(Tracked(drops.clone()));

        handle.reset_with(Tracked(drops.clone()));
        assert_eq!(drops.get(), 1);
        assert!(handle.is_valid());

        drop(handle);
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn test_release_transfers_out() {
        let mut handle = ExclusiveHandle::new(vec![1, 2, 3]);
        let released = handle.release().unwrap();
        assert_eq!(*released, vec![1, 2, 3]);
        assert!(handle.get().is_none());
    }

    #[test]
    fn test_swap() {
        let mut a = ExclusiveHandle::new(1);
        let mut b = ExclusiveHandle::empty();
        a.swap(&mut b);
        assert!(!a.is_valid());
        assert_eq!(*b, 1);
    }

    #[test]
    fn test_deref_mut() {
        let mut handle = ExclusiveHandle::new(10);
        *handle += 5;
        assert_eq!(*handle, 15);
    }

    #[test]
    #[should_panic(expected = "dereferenced an empty ExclusiveHandle")]
    fn test_deref_empty_panics() {
        let handle: ExclusiveHandle<u32> = ExclusiveHandle::empty();
        let _value: u32 = *handle;
    }

    #[test]
    fn test_absorbs_transfer_handle() {
        let mut transfer = TransferHandle::new(String::from("shader"));
        let exclusive = ExclusiveHandle::from(transfer.take());
        assert!(!transfer.is_valid());
        assert_eq!(exclusive.as_str(), "shader");
    }
}
