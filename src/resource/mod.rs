//! The resource cache: keys, slots, handles and the manager that ties them together.
//!
//! ```text
//! ResourceKey ──acquire──▶ ResourceManager ──▶ Slot (one per identity)
//!                                │                ▲
//!                                └──ResourcePtr───┘ (counted, shared, read-only)
//! ```
//!
//! - [`ResourceKey`] describes a resource: a [`KeyIdentity`] plus a loader.
//! - [`ResourceManager`] maps identities to slots, loading on a miss.
//! - [`ResourcePtr`] is what callers hold; the last one released evicts the slot.

mod handle;
mod key;
mod manager;
mod slot;

#[cfg(feature = "proptest")]
pub mod strategies;

pub use handle::ResourcePtr;
pub use key::{read_file, FromFile, FromMemory, FromSource, KeyIdentity, KeyOrigin, KeyParam, Loader, ResourceKey};
pub use manager::{CacheSnapshot, ResourceManager, SlotSnapshot};
