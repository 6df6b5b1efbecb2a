//! `ResourcePtr` — a counted, read-only handle to a cached resource.
//!
//! Every non-empty handle contributes exactly one to its slot's use count. Creating,
//! cloning, reassigning and dropping handles keeps that number exact, and the slot
//! leaves its cache when the count reaches zero.
//!
//! Handles compare, hash and order by slot identity, never by the resource's value:
//! two handles are equal exactly when they were obtained for the same cache entry
//! (or are both empty).

use super::key::KeyIdentity;
use super::slot::{Projected, Slot, SlotControl, SlotView};
use crate::error::contract_violation;
use core::any::Any;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::Deref;
use std::rc::Rc;

/// A shared, counted, immutable reference to a resource held by a
/// [`ResourceManager`](crate::resource::ResourceManager).
///
/// `T` is usually the cached resource type itself; [`map`](Self::map) derives
/// handles to a part of the resource or to a trait object it implements, and such
/// handles count toward the same slot.
///
/// Dereferencing an empty handle, or a handle whose cache was cleared, is a
/// contract violation and panics. [`get`](Self::get) is the non-panicking form.
pub struct ResourcePtr<T: ?Sized + 'static> {
    view: Option<Rc<dyn SlotView<T>>>,
}

impl<T: ?Sized + 'static> ResourcePtr<T> {
    /// Creates an empty handle that refers to nothing.
    pub const fn empty() -> Self {
        Self { view: None }
    }

    fn bind(view: Rc<dyn SlotView<T>>) -> Self {
        view.control().inc_ref();
        Self { view: Some(view) }
    }

    fn control(&self) -> Option<&dyn SlotControl> {
        self.view.as_deref().map(|view| view.control())
    }

    fn slot_addr(&self) -> *const () {
        match self.control() {
            Some(control) => core::ptr::from_ref(control).cast::<()>(),
            None => core::ptr::null(),
        }
    }

    /// Returns the resource, or `None` if the handle is empty or its cache was cleared.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.view.as_deref().and_then(|view| view.resource())
    }

    /// Returns `true` if the handle can be dereferenced.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.get().is_some()
    }

    /// Returns `true` if the handle refers to no slot at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.view.is_none()
    }

    /// Returns `true` if the handle's cache was cleared while it was alive.
    ///
    /// A detached handle still counts toward its slot and keeps the resource's
    /// memory, but it no longer dereferences.
    pub fn is_detached(&self) -> bool {
        self.control().is_some_and(|control| control.is_detached())
    }

    /// Number of live handles sharing this handle's slot; `0` for an empty handle.
    pub fn use_count(&self) -> usize {
        self.control().map_or(0, |control| control.use_count())
    }

    /// Identity of the cache entry this handle refers to.
    pub fn identity(&self) -> Option<&KeyIdentity> {
        self.control().map(|control| control.identity())
    }

    /// Releases this handle's reference, leaving it empty.
    pub fn reset(&mut self) {
        if let Some(view) = self.view.take() {
            view.control().dec_ref();
        }
    }

    /// Exchanges the slots referred to by two handles.
    ///
    /// No use count changes: each slot is still referred to by the same number of
    /// handles afterwards.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(&mut self.view, &mut other.view);
    }

    /// Returns `true` if both handles refer to the same slot.
    pub fn ptr_eq<U: ?Sized + 'static>(&self, other: &ResourcePtr<U>) -> bool {
        self.slot_addr() == other.slot_addr()
    }

    /// Derives a handle to part of the resource, counting toward the same slot.
    ///
    /// # Examples
    ///
    /// ```
    /// use hoard::resource::{ResourceKey, ResourceManager, ResourcePtr};
    /// use std::fmt::Display;
    ///
    /// let cache = ResourceManager::new();
    /// let key = ResourceKey::named("greeting", "", || Ok(String::from("hello")));
    /// let text = cache.acquire(&key)?;
    ///
    /// let shown: ResourcePtr<dyn Display> = text.map(|s| s as &dyn Display);
    /// assert_eq!(shown.to_string(), "hello");
    /// assert_eq!(text.use_count(), 2);
    /// # Ok::<(), hoard::LoadError>(())
    /// ```
    pub fn map<U: ?Sized + 'static>(&self, project: for<'a> fn(&'a T) -> &'a U) -> ResourcePtr<U> {
        match &self.view {
            Some(view) => ResourcePtr::<U>::bind(Rc::new(Projected::new(Rc::clone(view), project))),
            None => ResourcePtr::empty(),
        }
    }
}

impl<R: ?Sized + 'static> ResourcePtr<R> {
    pub(crate) fn from_slot(slot: Rc<Slot<R>>) -> Self {
        Self::bind(slot)
    }
}

impl<R: 'static> ResourcePtr<R> {
    /// Erases the resource type.
    pub fn into_any(self) -> ResourcePtr<dyn Any> {
        self.map(erase_any::<R>)
    }
}

fn erase_any<R: Any>(resource: &R) -> &(dyn Any + 'static) {
    resource
}

fn downcast_any<'a, R: Any>(resource: &'a (dyn Any + 'static)) -> &'a R {
    match resource.downcast_ref() {
        Some(resource) => resource,
        None => contract_violation("projected a resource to the wrong type"),
    }
}

impl ResourcePtr<dyn Any> {
    /// Recovers a typed handle, or gives the handle back unchanged if the resource
    /// is not an `R` (or the handle is not dereferenceable).
    pub fn downcast<R: Any>(self) -> Result<ResourcePtr<R>, Self> {
        if self.get().is_some_and(|resource| resource.is::<R>()) {
            Ok(self.map(downcast_any::<R>))
        } else {
            Err(self)
        }
    }
}

impl<T: ?Sized + 'static> Clone for ResourcePtr<T> {
    fn clone(&self) -> Self {
        match &self.view {
            Some(view) => Self::bind(Rc::clone(view)),
            None => Self::empty(),
        }
    }

    /// Rebinds `self` to `source`'s slot.
    ///
    /// Nothing happens if both already share the same view. Otherwise the new slot's
    /// count rises before the old one's falls, so rebinding between two handles of
    /// one slot never evicts it.
    fn clone_from(&mut self, source: &Self) {
        let same = match (&self.view, &source.view) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }
        if let Some(view) = &source.view {
            view.control().inc_ref();
        }
        let previous = core::mem::replace(&mut self.view, source.view.clone());
        if let Some(view) = previous {
            view.control().dec_ref();
        }
    }
}

impl<T: ?Sized + 'static> Drop for ResourcePtr<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized + 'static> Deref for ResourcePtr<T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.get() {
            Some(resource) => resource,
            None if self.is_detached() => contract_violation("dereferenced a ResourcePtr whose cache was cleared"),
            None => contract_violation("dereferenced an empty ResourcePtr"),
        }
    }
}

impl<T: ?Sized + 'static> Default for ResourcePtr<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized + 'static, U: ?Sized + 'static> PartialEq<ResourcePtr<U>> for ResourcePtr<T> {
    fn eq(&self, other: &ResourcePtr<U>) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: ?Sized + 'static> Eq for ResourcePtr<T> {}

impl<T: ?Sized + 'static> PartialOrd for ResourcePtr<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ?Sized + 'static> Ord for ResourcePtr<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.slot_addr().cmp(&other.slot_addr())
    }
}

impl<T: ?Sized + 'static> Hash for ResourcePtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot_addr().hash(state);
    }
}

impl<T: ?Sized + fmt::Debug + 'static> fmt::Debug for ResourcePtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.control() {
            Some(control) => f
                .debug_struct("ResourcePtr")
                .field("identity", &format_args!("{}", control.identity()))
                .field("use_count", &control.use_count())
                .field("resource", &self.get())
                .finish(),
            None => f.write_str("ResourcePtr(empty)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceKey, ResourceManager};
    use std::collections::HashSet;

    fn cache_with(value: u32) -> (ResourceManager<u32>, ResourceKey<u32>) {
        let key = ResourceKey::named("value", "", move || Ok(value));
        (ResourceManager::new(), key)
    }

    #[test]
    fn test_clone_and_drop_track_count() {
        let (cache, key) = cache_with(1);
        let a = cache.acquire(&key).unwrap();
        let b = a.clone();
        assert_eq!(a.use_count(), 2);
        drop(b);
        assert_eq!(a.use_count(), 1);
        drop(a);
        assert!(!cache.contains(&key));
    }

    #[test]
    fn test_clone_from_same_slot_keeps_entry() {
        let (cache, key) = cache_with(1);
        let a = cache.acquire(&key).unwrap();
        let mut b = a.clone();
        b.clone_from(&a);
        assert_eq!(a.use_count(), 2);
        assert!(cache.contains(&key));
    }

    #[test]
    fn test_clone_from_rebinds_and_evicts_old() {
        let cache = ResourceManager::new();
        let one = ResourceKey::named("one", "", || Ok(1u32));
        let two = ResourceKey::named("two", "", || Ok(2u32));

        let mut a = cache.acquire(&one).unwrap();
        let b = cache.acquire(&two).unwrap();
        a.clone_from(&b);

        assert_eq!(*a, 2);
        assert_eq!(b.use_count(), 2);
        assert!(!cache.contains(&one));
    }

    #[test]
    fn test_swap_keeps_counts() {
        let cache = ResourceManager::new();
        let one = ResourceKey::named("one", "", || Ok(1u32));
        let two = ResourceKey::named("two", "", || Ok(2u32));

        let mut a = cache.acquire(&one).unwrap();
        let mut b = cache.acquire(&two).unwrap();
        a.swap(&mut b);
        assert_eq!((*a, *b), (2, 1));
        assert_eq!((a.use_count(), b.use_count()), (1, 1));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reset_then_empty_is_valid_state() {
        let (cache, key) = cache_with(3);
        let mut a = cache.acquire(&key).unwrap();
        a.reset();
        assert!(a.is_empty());
        assert_eq!(a.use_count(), 0);
        assert!(a.get().is_none());
        a.reset();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_equality_is_slot_identity() {
        let cache = ResourceManager::new();
        let one = ResourceKey::named("one", "", || Ok(5u32));
        let two = ResourceKey::named("two", "", || Ok(5u32));

        let a = cache.acquire(&one).unwrap();
        let b = cache.acquire(&one).unwrap();
        let c = cache.acquire(&two).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ResourcePtr::<u32>::empty(), ResourcePtr::<u32>::empty());

        let set: HashSet<_> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_map_counts_toward_source_slot() {
        let cache = ResourceManager::new();
        let key = ResourceKey::named("pair", "", || Ok((4u8, String::from("four"))));
        let pair = cache.acquire(&key).unwrap();
        let name: ResourcePtr<String> = pair.map(|p| &p.1);

        assert_eq!(name.as_str(), "four");
        assert_eq!(pair.use_count(), 2);
        assert!(name.ptr_eq(&pair));
        assert!(name == pair);

        drop(pair);
        assert!(cache.contains(&key));
        drop(name);
        assert!(!cache.contains(&key));
    }

    #[test]
    fn test_downcast_round_trip() {
        let (cache, key) = cache_with(9);
        let any = cache.acquire(&key).unwrap().into_any();
        let wrong = any.downcast::<String>().unwrap_err();
        let typed = wrong.downcast::<u32>().unwrap();
        assert_eq!(*typed, 9);
        assert_eq!(typed.use_count(), 1);
    }

    #[test]
    #[should_panic(expected = "dereferenced an empty ResourcePtr")]
    fn test_deref_empty_panics() {
        let handle: ResourcePtr<u32> = ResourcePtr::empty();
        let _value: u32 = *handle;
    }

    #[test]
    fn test_clear_detaches_live_handles_only() {
        let (cache, key) = cache_with(4);
        let held = cache.acquire(&key).unwrap();
        let empty: ResourcePtr<u32> = ResourcePtr::empty();
        assert!(!held.is_detached());

        cache.clear();
        assert!(held.is_detached());
        assert!(!held.is_empty());
        assert_eq!(held.use_count(), 1);
        assert!(!empty.is_detached());
    }

    #[test]
    #[should_panic(expected = "whose cache was cleared")]
    fn test_deref_detached_names_the_clear() {
        let (cache, key) = cache_with(4);
        let held = cache.acquire(&key).unwrap();
        cache.clear();
        let _value: u32 = *held;
    }

    #[test]
    fn test_debug_shows_identity() {
        let (cache, key) = cache_with(2);
        let handle = cache.acquire(&key).unwrap();
        let shown = format!("{handle:?}");
        assert!(shown.contains("named:value"));
        assert!(shown.contains("use_count: 1"));
    }
}
