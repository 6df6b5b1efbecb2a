//! `Slot` — one cached resource and its handle count.
//!
//! A slot is created only after its loader succeeds, so a slot always holds a
//! resource. The resource is never replaced or mutated afterwards; the only mutable
//! state is the handle count and the detached flag, both in `Cell`s.
//!
//! When the count falls to zero the slot removes its own registry entry. The removal
//! checks pointer identity, so a stale slot can never evict a newer entry that
//! happens to share its identity.

use super::key::{KeyIdentity, ResourceKey};
use crate::error::LoadError;
use crate::macros::debug_event;
use crate::ptr::ExclusiveHandle;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// The map shared by a manager and, weakly, by each of its slots.
pub(crate) type Registry<R> = RefCell<BTreeMap<KeyIdentity, Rc<Slot<R>>>>;

/// Count bookkeeping common to every slot, whatever its resource type.
pub(crate) trait SlotControl {
    fn identity(&self) -> &KeyIdentity;
    fn use_count(&self) -> usize;
    fn is_detached(&self) -> bool;
    fn inc_ref(&self);
    fn dec_ref(&self);
}

/// Typed access to the resource behind a slot, possibly through a projection.
pub(crate) trait SlotView<T: ?Sized> {
    fn control(&self) -> &dyn SlotControl;

    /// `None` once the slot is detached.
    fn resource(&self) -> Option<&T>;
}

pub(crate) struct Slot<R: ?Sized + 'static> {
    identity: KeyIdentity,
    resource: ExclusiveHandle<R>,
    refs: Cell<usize>,
    detached: Cell<bool>,
    registry: Weak<Registry<R>>,
    /// The owning cache's label, for log events raised after the manager is gone.
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    label: Rc<str>,
}

impl<R: ?Sized + 'static> Slot<R> {
    /// Runs the key's loader and wraps the result. Nothing is registered here; on
    /// failure no slot ever exists.
    pub(crate) fn load(key: &ResourceKey<R>, registry: Weak<Registry<R>>, label: Rc<str>) -> Result<Self, LoadError> {
        let resource = ExclusiveHandle::from(key.load()?);
        Ok(Self {
            identity: key.identity().clone(),
            resource,
            refs: Cell::new(0),
            detached: Cell::new(false),
            registry,
            label,
        })
    }

    /// Cuts the slot loose from its cache. Handles stay alive but no longer
    /// dereference, and the slot never touches the registry again.
    pub(crate) fn detach(&self) {
        self.detached.set(true);
    }

    fn evict(&self) {
        if self.detached.get() {
            return;
        }
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let removed = {
            let mut map = registry.borrow_mut();
            match map.get(&self.identity) {
                Some(entry) if std::ptr::eq(Rc::as_ptr(entry), self) => map.remove(&self.identity),
                _ => None,
            }
        };
        if removed.is_some() {
            debug_event!(cache = %self.label, identity = %self.identity, "evicted resource");
        }
        // The registry borrow is released before `removed` drops, so a resource
        // whose destructor releases other handles cannot re-enter a live borrow.
        drop(removed);
    }
}

impl<R: ?Sized + 'static> SlotControl for Slot<R> {
    fn identity(&self) -> &KeyIdentity {
        &self.identity
    }

    fn use_count(&self) -> usize {
        self.refs.get()
    }

    fn is_detached(&self) -> bool {
        self.detached.get()
    }

    fn inc_ref(&self) {
        self.refs.set(self.refs.get() + 1);
    }

    fn dec_ref(&self) {
        let remaining = self.refs.get() - 1;
        self.refs.set(remaining);
        if remaining == 0 {
            self.evict();
        }
    }
}

impl<R: ?Sized + 'static> SlotView<R> for Slot<R> {
    fn control(&self) -> &dyn SlotControl {
        self
    }

    fn resource(&self) -> Option<&R> {
        if self.detached.get() {
            None
        } else {
            self.resource.get()
        }
    }
}

/// A view of some part of another view's resource, such as a field or a trait object.
pub(crate) struct Projected<S: ?Sized + 'static, T: ?Sized + 'static> {
    source: Rc<dyn SlotView<S>>,
    project: for<'a> fn(&'a S) -> &'a T,
}

impl<S: ?Sized + 'static, T: ?Sized + 'static> Projected<S, T> {
    pub(crate) fn new(source: Rc<dyn SlotView<S>>, project: for<'a> fn(&'a S) -> &'a T) -> Self {
        Self { source, project }
    }
}

impl<S: ?Sized + 'static, T: ?Sized + 'static> SlotView<T> for Projected<S, T> {
    fn control(&self) -> &dyn SlotControl {
        self.source.control()
    }

    fn resource(&self) -> Option<&T> {
        self.source.resource().map(self.project)
    }
}
