//! `OwnershipCell` — one owned value plus the capability that destroys it.
//!
//! Every handle kind in [`crate::ptr`] is a thin policy layer over this cell. The
//! destroy capability is chosen when a value is adopted and travels with it: moving
//! a value from one handle kind to another moves its [`Disposal`] too, so the
//! receiving handle never has to re-derive how the value must be torn down.
//!
//! `T` may be unsized (`OwnershipCell<dyn Trait>`), which lets a cell be declared
//! and passed around without knowing the concrete type behind it.

use core::fmt;
use core::mem;

/// How an [`OwnershipCell`] destroys the value it owns.
pub enum Disposal<T: ?Sized> {
    /// Run the value's destructor and free its allocation.
    Drop,
    /// Hand the value to a caller-supplied destroy function.
    Custom(Box<dyn FnOnce(Box<T>)>),
}

impl<T: ?Sized> Disposal<T> {
    /// Wraps `destroy` as a custom disposal.
    pub fn custom<F>(destroy: F) -> Self
    where
        F: FnOnce(Box<T>) + 'static,
    {
        Self::Custom(Box::new(destroy))
    }

    /// Returns which variant this is.
    pub fn kind(&self) -> DisposalKind {
        match self {
            Self::Drop => DisposalKind::Drop,
            Self::Custom(_) => DisposalKind::Custom,
        }
    }

    fn dispose(self, value: Box<T>) {
        match self {
            Self::Drop => drop(value),
            Self::Custom(destroy) => destroy(value),
        }
    }
}

impl<T: ?Sized> Default for Disposal<T> {
    fn default() -> Self {
        Self::Drop
    }
}

impl<T: ?Sized> fmt::Debug for Disposal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.kind(), f)
    }
}

/// Discriminant of a [`Disposal`], for inspection without access to the closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalKind {
    /// See [`Disposal::Drop`].
    Drop,
    /// See [`Disposal::Custom`].
    Custom,
}

/// Storage for zero or one owned value together with its destroy capability.
///
/// Dropping the cell destroys the value through the bound [`Disposal`]; dropping
/// an empty cell does nothing.
pub struct OwnershipCell<T: ?Sized> {
    value: Option<Box<T>>,
    disposal: Disposal<T>,
}

impl<T> OwnershipCell<T> {
    /// Adopts `value` with the default [`Disposal::Drop`].
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }
}

impl<T: ?Sized> OwnershipCell<T> {
    /// Creates an empty cell.
    pub const fn empty() -> Self {
        Self {
            value: None,
            disposal: Disposal::Drop,
        }
    }

    /// Adopts an already boxed value with the default [`Disposal::Drop`].
    pub fn from_box(value: Box<T>) -> Self {
        Self {
            value: Some(value),
            disposal: Disposal::Drop,
        }
    }

    /// Adopts `value` and binds an explicit destroy capability to it.
    pub fn with_disposal(value: Box<T>, disposal: Disposal<T>) -> Self {
        Self {
            value: Some(value),
            disposal,
        }
    }

    /// Returns `true` if the cell owns nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Returns a reference to the owned value.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.value.as_deref()
    }

    /// Returns a mutable reference to the owned value.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.value.as_deref_mut()
    }

    /// Returns the kind of destroy capability currently bound.
    pub fn disposal_kind(&self) -> DisposalKind {
        self.disposal.kind()
    }

    /// Exchanges value and destroy capability with `other` in constant time.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Detaches the owned value and leaves the cell empty.
    ///
    /// The bound destroy capability is discarded: the returned box is dropped the
    /// ordinary way unless the caller arranges otherwise.
    pub fn release(&mut self) -> Option<Box<T>> {
        self.disposal = Disposal::Drop;
        self.value.take()
    }

    /// Detaches the owned value together with its destroy capability.
    ///
    /// This is how ownership moves between handle kinds without losing a custom
    /// destroy function.
    pub fn release_with_disposal(&mut self) -> Option<(Box<T>, Disposal<T>)> {
        let disposal = mem::take(&mut self.disposal);
        self.value.take().map(|value| (value, disposal))
    }

    /// Destroys the owned value, if any, leaving the cell empty.
    pub fn reset(&mut self) {
        if let Some((value, disposal)) = self.release_with_disposal() {
            disposal.dispose(value);
        }
    }
}

impl<T: ?Sized> Drop for OwnershipCell<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized> Default for OwnershipCell<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for OwnershipCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnershipCell")
            .field("value", &self.get())
            .field("disposal", &self.disposal.kind())
            .finish()
    }
}
