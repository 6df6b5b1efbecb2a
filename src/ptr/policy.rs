//! `PolicyHandle` — deep-copy ownership driven by a duplication policy.
//!
//! Cloning a `PolicyHandle` produces an independent copy of the owned value; how
//! that copy is made is the policy's business:
//!
//! - [`PlainDuplicate`]: `T::clone`, for sized `Clone` types.
//! - [`PolymorphicDuplicate`]: [`Duplicate::duplicate`], which keeps the dynamic
//!   type when `T` is a trait object.
//! - [`CustomDuplicate`]: a caller-supplied duplicate/destroy pair.
//! - [`DynamicDuplicate`]: the concrete type's `Clone`, captured when the handle
//!   is built, for trait objects that opt into [`AsAny`].
//!
//! The policy is never asked to duplicate an empty handle.

use super::cell::OwnershipCell;
use crate::error::contract_violation;
use core::any::Any;
use core::fmt;
use core::ops::{Deref, DerefMut};
use std::rc::Rc;

/// Strategy used by [`PolicyHandle`] to copy and destroy its value.
pub trait DuplicationPolicy<T: ?Sized> {
    /// Produces an independent copy of `value`.
    fn duplicate(&self, value: &T) -> Box<T>;

    /// Destroys a value owned by the handle. Defaults to dropping it.
    fn destroy(&self, value: Box<T>) {
        drop(value);
    }
}

/// Copies via [`Clone`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainDuplicate;

impl<T: Clone> DuplicationPolicy<T> for PlainDuplicate {
    fn duplicate(&self, value: &T) -> Box<T> {
        Box::new(value.clone())
    }
}

/// Types that can produce a boxed copy of themselves, preserving their dynamic type.
///
/// Implement it on a trait-object type (`impl Duplicate for dyn Shape`) by
/// forwarding to a method of the trait, or rely on the blanket impl for sized
/// `Clone` types.
///
/// # Examples
///
/// ```
/// use hoard::ptr::{Duplicate, PolicyHandle, PolymorphicDuplicate};
///
/// trait Shape {
///     fn area(&self) -> f32;
///     fn boxed_clone(&self) -> Box<dyn Shape>;
/// }
///
/// #[derive(Clone)]
/// struct Square(f32);
///
/// impl Shape for Square {
///     fn area(&self) -> f32 { self.0 * self.0 }
///     fn boxed_clone(&self) -> Box<dyn Shape> { Box::new(self.clone()) }
/// }
///
/// impl Duplicate for dyn Shape {
///     fn duplicate(&self) -> Box<dyn Shape> { self.boxed_clone() }
/// }
///
/// let a: PolicyHandle<dyn Shape, PolymorphicDuplicate> =
///     PolicyHandle::from_box(Box::new(Square(2.0)));
/// let b = a.clone();
/// assert_eq!(b.area(), 4.0);
/// ```
pub trait Duplicate {
    /// Returns a boxed copy of `self`.
    fn duplicate(&self) -> Box<Self>;
}

impl<T: Clone> Duplicate for T {
    fn duplicate(&self) -> Box<Self> {
        Box::new(self.clone())
    }
}

/// Copies via [`Duplicate`], so the dynamic type survives the copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolymorphicDuplicate;

impl<T: ?Sized + Duplicate> DuplicationPolicy<T> for PolymorphicDuplicate {
    fn duplicate(&self, value: &T) -> Box<T> {
        value.duplicate()
    }
}

/// Caller-supplied duplicate and destroy functions.
///
/// The functions are reference counted so that cloning the policy (which happens
/// on every handle clone) stays cheap.
pub struct CustomDuplicate<T: ?Sized> {
    duplicate: Rc<dyn Fn(&T) -> Box<T>>,
    destroy: Rc<dyn Fn(Box<T>)>,
}

impl<T: ?Sized + 'static> CustomDuplicate<T> {
    /// Uses `duplicate` to copy and drops values normally.
    pub fn new<D>(duplicate: D) -> Self
    where
        D: Fn(&T) -> Box<T> + 'static,
    {
        Self {
            duplicate: Rc::new(duplicate),
            destroy: Rc::new(|value: Box<T>| drop(value)),
        }
    }

    /// Uses `duplicate` to copy and `destroy` to tear values down.
    pub fn with_destroy<D, X>(duplicate: D, destroy: X) -> Self
    where
        D: Fn(&T) -> Box<T> + 'static,
        X: Fn(Box<T>) + 'static,
    {
        Self {
            duplicate: Rc::new(duplicate),
            destroy: Rc::new(destroy),
        }
    }
}

impl<T: ?Sized> Clone for CustomDuplicate<T> {
    fn clone(&self) -> Self {
        Self {
            duplicate: Rc::clone(&self.duplicate),
            destroy: Rc::clone(&self.destroy),
        }
    }
}

impl<T: ?Sized> DuplicationPolicy<T> for CustomDuplicate<T> {
    fn duplicate(&self, value: &T) -> Box<T> {
        (self.duplicate)(value)
    }

    fn destroy(&self, value: Box<T>) {
        (self.destroy)(value);
    }
}

impl<T: ?Sized> fmt::Debug for CustomDuplicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDuplicate").finish_non_exhaustive()
    }
}

/// Lets trait objects be viewed as `dyn Any`, so their concrete type can be recovered.
///
/// Make it a supertrait of your own trait (`trait Shape: AsAny`); the blanket impl
/// covers every `'static` type.
pub trait AsAny {
    /// Returns the value as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Copies through the `Clone` impl of a concrete type chosen at construction.
///
/// The trait object needs no duplicate method of its own. The handle must keep
/// holding a value of that concrete type: duplicating anything else is a contract
/// violation.
///
/// # Examples
///
/// ```
/// use hoard::ptr::{AsAny, DynamicDuplicate, PolicyHandle};
///
/// trait Shape: AsAny {
///     fn area(&self) -> f32;
/// }
///
/// #[derive(Clone)]
/// struct Square(f32);
///
/// impl Shape for Square {
///     fn area(&self) -> f32 { self.0 * self.0 }
/// }
///
/// type ShapeHandle = PolicyHandle<dyn Shape, DynamicDuplicate<dyn Shape>>;
///
/// let a = ShapeHandle::from_concrete(Square(3.0), |square| square);
/// assert_eq!(a.clone().area(), 9.0);
/// ```
pub struct DynamicDuplicate<T: ?Sized> {
    duplicate: Rc<dyn Fn(&T) -> Box<T>>,
}

impl<T: ?Sized + AsAny + 'static> DynamicDuplicate<T> {
    /// Duplicates values of concrete type `C`, converting each copy with `upcast`.
    pub fn of<C: Clone + 'static>(upcast: fn(Box<C>) -> Box<T>) -> Self {
        Self {
            duplicate: Rc::new(move |value: &T| match value.as_any().downcast_ref::<C>() {
                Some(concrete) => upcast(Box::new(concrete.clone())),
                None => contract_violation("DynamicDuplicate given a value of another concrete type"),
            }),
        }
    }
}

impl<T: ?Sized> Clone for DynamicDuplicate<T> {
    fn clone(&self) -> Self {
        Self {
            duplicate: Rc::clone(&self.duplicate),
        }
    }
}

impl<T: ?Sized> DuplicationPolicy<T> for DynamicDuplicate<T> {
    fn duplicate(&self, value: &T) -> Box<T> {
        (self.duplicate)(value)
    }
}

impl<T: ?Sized> fmt::Debug for DynamicDuplicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicDuplicate").finish_non_exhaustive()
    }
}

/// Ownership of zero or one value, deep-copied through `P` on clone.
pub struct PolicyHandle<T: ?Sized, P: DuplicationPolicy<T> = PlainDuplicate> {
    cell: OwnershipCell<T>,
    policy: P,
}

impl<T, P: DuplicationPolicy<T> + Default> PolicyHandle<T, P> {
    /// Takes ownership of `value` using the default-constructed policy.
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }
}

impl<T: ?Sized, P: DuplicationPolicy<T> + Default> PolicyHandle<T, P> {
    /// Creates an empty handle with the default-constructed policy.
    pub fn empty() -> Self {
        Self::empty_with_policy(P::default())
    }

    /// Takes ownership of a boxed value using the default-constructed policy.
    pub fn from_box(value: Box<T>) -> Self {
        Self::with_policy(value, P::default())
    }
}

impl<T: ?Sized, P: DuplicationPolicy<T>> PolicyHandle<T, P> {
    /// Takes ownership of `value`, copying and destroying it through `policy`.
    pub fn with_policy(value: Box<T>, policy: P) -> Self {
        Self {
            cell: OwnershipCell::from_box(value),
            policy,
        }
    }

    /// Creates an empty handle that will use `policy` once it owns a value.
    pub fn empty_with_policy(policy: P) -> Self {
        Self {
            cell: OwnershipCell::empty(),
            policy,
        }
    }

    /// Returns the duplication policy.
    pub fn policy(&self) -> &P {
        &self.policy
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

    /// Exchanges value and policy with `other`.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Destroys the owned value through the policy, leaving the handle empty.
    pub fn reset(&mut self) {
        if let Some(value) = self.cell.release() {
            self.policy.destroy(value);
        }
    }

    /// Destroys the current value and takes ownership of `value`.
    pub fn reset_with_box(&mut self, value: Box<T>) {
        self.reset();
        self.cell = OwnershipCell::from_box(value);
    }

    /// Gives up ownership without destroying the value.
    pub fn release(&mut self) -> Option<Box<T>> {
        self.cell.release()
    }

    fn duplicate_cell(&self) -> OwnershipCell<T> {
        match self.cell.get() {
            Some(value) => OwnershipCell::from_box(self.policy.duplicate(value)),
            None => OwnershipCell::empty(),
        }
    }
}

impl<T: ?Sized + AsAny + 'static> PolicyHandle<T, DynamicDuplicate<T>> {
    /// Takes ownership of `value` and remembers how to copy its concrete type.
    ///
    /// `upcast` turns the concrete box into the handle's type; for a trait object
    /// the identity closure `|value| value` does it.
    pub fn from_concrete<C: Clone + 'static>(value: C, upcast: fn(Box<C>) -> Box<T>) -> Self {
        Self::with_policy(upcast(Box::new(value)), DynamicDuplicate::of(upcast))
    }
}

impl<T: ?Sized, P: DuplicationPolicy<T> + Clone> Clone for PolicyHandle<T, P> {
    fn clone(&self) -> Self {
        Self {
            cell: self.duplicate_cell(),
            policy: self.policy.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        // Copy first: a panicking duplicate must leave `self` untouched.
        let copy = source.duplicate_cell();
        self.reset();
        self.cell = copy;
        self.policy = source.policy.clone();
    }
}

impl<T: ?Sized, P: DuplicationPolicy<T>> Drop for PolicyHandle<T, P> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized, P: DuplicationPolicy<T>> Deref for PolicyHandle<T, P> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.cell.get() {
            Some(value) => value,
            None => contract_violation("dereferenced an empty PolicyHandle"),
        }
    }
}

impl<T: ?Sized, P: DuplicationPolicy<T>> DerefMut for PolicyHandle<T, P> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        match self.cell.get_mut() {
            Some(value) => value,
            None => contract_violation("dereferenced an empty PolicyHandle"),
        }
    }
}

impl<T: ?Sized, P: DuplicationPolicy<T> + Default> Default for PolicyHandle<T, P> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized + fmt::Debug, P: DuplicationPolicy<T>> fmt::Debug for PolicyHandle<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PolicyHandle").field(&self.get()).finish()
    }
}
