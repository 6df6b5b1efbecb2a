//! `ResourceManager` — a load-once cache of counted resources.
//!
//! Key features:
//! - At most one live slot per [`KeyIdentity`]; repeated acquisitions share it.
//! - Loaders run only on a miss, synchronously, with no internal borrow held.
//! - A failed load leaves the cache exactly as it was.
//! - Entries disappear as soon as their last [`ResourcePtr`] is released.
//!
//! The cache is single-threaded. It is neither `Send` nor `Sync`, and handles must
//! not cross threads either.

use super::handle::ResourcePtr;
use super::key::{KeyIdentity, ResourceKey};
use super::slot::{Registry, Slot, SlotControl};
use crate::error::LoadError;
use crate::macros::{debug_event, trace_event, warn_event};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A cache mapping resource identities to shared, counted resources.
///
/// All operations take `&self`; the cache can be shared by reference across the
/// code that acquires from it. Handles hold no borrow of the cache.
///
/// # Clearing and dropping
///
/// [`clear`](Self::clear) empties the cache and invalidates every outstanding
/// handle: dereferencing one afterwards panics, and
/// [`ResourcePtr::get`] returns `None`. Dropping the cache, by contrast, leaves
/// outstanding handles fully usable; each resource is destroyed with its last
/// handle.
///
/// # Examples
///
/// ```
/// use hoard::resource::{ResourceKey, ResourceManager};
///
/// let textures: ResourceManager<Vec<u8>> = ResourceManager::with_label("textures");
/// let key = ResourceKey::named("checker", "", || Ok(vec![0, 255, 0, 255]));
///
/// let a = textures.acquire(&key)?;
/// let b = textures.acquire(&key)?;
/// assert!(a.ptr_eq(&b));
/// assert_eq!(textures.use_count(&key), 2);
///
/// drop((a, b));
/// assert!(textures.is_empty());
/// # Ok::<(), hoard::LoadError>(())
/// ```
pub struct ResourceManager<R: ?Sized + 'static> {
    registry: Rc<Registry<R>>,
    label: Rc<str>,
}

impl<R: ?Sized + 'static> ResourceManager<R> {
    /// Creates an empty cache labelled with the resource type's name.
    pub fn new() -> Self {
        Self::with_label(std::any::type_name::<R>())
    }

    /// Creates an empty cache whose log events carry `label`.
    pub fn with_label(label: impl Into<Rc<str>>) -> Self {
        Self {
            registry: Rc::new(RefCell::new(BTreeMap::new())),
            label: label.into(),
        }
    }

    /// Returns the label attached to this cache's log events and snapshots.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns a handle to the resource described by `key`, loading it on a miss.
    ///
    /// On a hit the loader is not run. On a miss the loader runs exactly once; if it
    /// fails, the error is returned and the cache is left unchanged, so a later call
    /// with the same key tries again.
    ///
    /// # Errors
    ///
    /// Returns the loader's [`LoadError`] on a failed miss.
    pub fn acquire(&self, key: &ResourceKey<R>) -> Result<ResourcePtr<R>, LoadError> {
        let cached = self.registry.borrow().get(key.identity()).cloned();
        if let Some(slot) = cached {
            trace_event!(cache = %self.label, identity = %key.identity(), "cache hit");
            return Ok(ResourcePtr::from_slot(slot));
        }

        let slot = match Slot::load(key, Rc::downgrade(&self.registry), Rc::clone(&self.label)) {
            Ok(slot) => Rc::new(slot),
            Err(err) => {
                warn_event!(cache = %self.label, identity = %key.identity(), error = %err, "resource load failed");
                return Err(err);
            }
        };

        // A loader may itself acquire from this cache. If it managed to populate
        // this very identity, the entry that got there first wins.
        let slot = match self.registry.borrow_mut().entry(key.identity().clone()) {
            Entry::Vacant(vacant) => {
                debug_event!(cache = %self.label, identity = %key.identity(), "loaded resource");
                Rc::clone(vacant.insert(slot))
            }
            Entry::Occupied(occupied) => Rc::clone(occupied.get()),
        };
        Ok(ResourcePtr::from_slot(slot))
    }

    /// Returns `true` if a live entry exists for `key`'s identity.
    pub fn contains(&self, key: &ResourceKey<R>) -> bool {
        self.contains_identity(key.identity())
    }

    /// Returns `true` if a live entry exists for `identity`.
    pub fn contains_identity(&self, identity: &KeyIdentity) -> bool {
        self.registry.borrow().contains_key(identity)
    }

    /// Number of live handles for `key`'s entry, or `0` if none is cached.
    pub fn use_count(&self, key: &ResourceKey<R>) -> usize {
        self.registry
            .borrow()
            .get(key.identity())
            .map_or(0, |slot| slot.use_count())
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.registry.borrow().is_empty()
    }

    /// Drops every entry and invalidates all outstanding handles.
    ///
    /// Handles obtained before the call keep their memory alive until they are
    /// dropped, but no longer dereference.
    pub fn clear(&self) {
        let slots = std::mem::take(&mut *self.registry.borrow_mut());
        for slot in slots.values() {
            slot.detach();
        }
        debug_event!(cache = %self.label, evicted = slots.len(), "cleared cache");
        drop(slots);
    }

    /// Captures the current entries and their use counts, in identity order.
    pub fn snapshot(&self) -> CacheSnapshot {
        let slots = self
            .registry
            .borrow()
            .values()
            .map(|slot| SlotSnapshot {
                identity: slot.identity().clone(),
                use_count: slot.use_count(),
            })
            .collect();
        CacheSnapshot {
            label: self.label.to_string(),
            slots,
        }
    }
}

impl<R: ?Sized + 'static> Default for ResourceManager<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ?Sized + 'static> fmt::Debug for ResourceManager<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("label", &self.label)
            .field("len", &self.len())
            .finish()
    }
}

/// A point-in-time view of a cache, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheSnapshot {
    /// The cache's label.
    pub label: String,
    /// One entry per cached resource, ordered by identity.
    pub slots: Vec<SlotSnapshot>,
}

impl CacheSnapshot {
    /// Total number of live handles across all entries.
    pub fn total_handles(&self) -> usize {
        self.slots.iter().map(|slot| slot.use_count).sum()
    }
}

/// One entry of a [`CacheSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSnapshot {
    /// The entry's identity.
    pub identity: KeyIdentity,
    /// Live handles at the time of the snapshot.
    pub use_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counting_key(name: &str, calls: &Rc<Cell<usize>>) -> ResourceKey<String> {
        let calls = Rc::clone(calls);
        let value = name.to_owned();
        ResourceKey::named(name, "", move || {
            calls.set(calls.get() + 1);
            Ok(value.clone())
        })
    }

    #[test]
    fn test_hit_does_not_reload() {
        let calls = Rc::new(Cell::new(0));
        let cache = ResourceManager::new();
        let key = counting_key("a", &calls);

        let first = cache.acquire(&key).unwrap();
        let second = cache.acquire(&key).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(first.ptr_eq(&second));
        assert_eq!(cache.use_count(&key), 2);
    }

    #[test]
    fn test_failed_load_leaves_cache_unchanged() {
        let attempts = Rc::new(Cell::new(0));
        let seen = Rc::clone(&attempts);
        let cache: ResourceManager<u8> = ResourceManager::new();
        let key = ResourceKey::named("flaky", "", move || {
            seen.set(seen.get() + 1);
            if seen.get() == 1 {
                Err(LoadError::new("first try fails"))
            } else {
                Ok(1)
            }
        });

        assert!(cache.acquire(&key).is_err());
        assert!(cache.is_empty());
        let handle = cache.acquire(&key).unwrap();
        assert_eq!(*handle, 1);
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn test_loader_may_acquire_other_keys() {
        let cache = Rc::new(ResourceManager::<String>::new());
        let inner = ResourceKey::named("inner", "", || Ok(String::from("in")));
        let cache_in_loader = Rc::clone(&cache);
        let inner_in_loader = inner.clone();
        let outer = ResourceKey::named("outer", "", move || {
            let part = cache_in_loader.acquire(&inner_in_loader)?;
            Ok(format!("out+{}", *part))
        });

        let handle = cache.acquire(&outer).unwrap();
        assert_eq!(handle.as_str(), "out+in");
        assert!(!cache.contains(&inner));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_detaches_live_handles() {
        let calls = Rc::new(Cell::new(0));
        let cache = ResourceManager::new();
        let key = counting_key("a", &calls);
        let handle = cache.acquire(&key).unwrap();

        cache.clear();
        assert!(cache.is_empty());
        assert!(!handle.is_valid());
        assert!(handle.get().is_none());

        let fresh = cache.acquire(&key).unwrap();
        assert_eq!(calls.get(), 2);
        assert!(!fresh.ptr_eq(&handle));
        drop(handle);
        assert!(cache.contains(&key));
    }

    #[test]
    fn test_dropping_cache_keeps_handles_usable() {
        let cache = ResourceManager::new();
        let key = ResourceKey::named("keep", "", || Ok(42u64));
        let handle = cache.acquire(&key).unwrap();
        let copy = handle.clone();
        drop(cache);

        assert_eq!(*handle, 42);
        drop(handle);
        assert_eq!(*copy, 42);
    }

    #[test]
    fn test_snapshot_orders_by_identity() {
        let calls = Rc::new(Cell::new(0));
        let cache = ResourceManager::with_label("strings");
        let b = cache.acquire(&counting_key("b", &calls)).unwrap();
        let a = cache.acquire(&counting_key("a", &calls)).unwrap();
        let _a2 = a.clone();

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.label, "strings");
        let names: Vec<String> = snapshot.slots.iter().map(|s| s.identity.to_string()).collect();
        assert_eq!(names, ["named:a", "named:b"]);
        assert_eq!(snapshot.total_handles(), 3);
        drop(b);
    }

    #[test]
    fn test_default_label_is_type_name() {
        let cache: ResourceManager<Vec<u8>> = ResourceManager::default();
        assert!(cache.label().contains("Vec"));
    }
}
