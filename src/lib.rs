//! # `hoard` - Load-Once Resource Cache
//!
//! A single-threaded cache for expensive-to-build resources (textures, shaders,
//! fonts, decoded files) together with the small family of ownership handles it is
//! built from.
//!
//! ## Guarantees
//!
//! - **Load once**: at most one live resource exists per key identity. Acquiring an
//!   identity that is already cached returns a handle to the existing resource and
//!   never runs the loader.
//! - **Exact counting**: every live [`ResourcePtr`] contributes one to its entry's use
//!   count. Clone, reassignment, swap, reset and drop all keep it exact.
//! - **Prompt eviction**: the entry leaves the cache when its last handle is released.
//! - **Clean failure**: a loader error is returned to the caller and leaves the cache
//!   exactly as it was.
//!
//! Breaking a documented precondition (dereferencing an empty handle, or one whose
//! cache was cleared) is a contract violation and panics.
//!
//! ## Architecture
//!
//! 1. **Ownership primitives** ([`ptr`]):
//!    - [`OwnershipCell`] holds zero or one value plus its destroy capability
//!    - [`ExclusiveHandle`] is non-copyable sole ownership
//!    - [`TransferHandle`] moves ownership out of a borrowed handle, leaving it empty
//!    - [`PolicyHandle`] deep-copies through a pluggable [`DuplicationPolicy`]
//!
//! 2. **Resource cache** ([`resource`]):
//!    - [`ResourceKey`] pairs a [`KeyIdentity`] with a loader
//!    - [`ResourceManager`] maps identities to counted slots
//!    - [`ResourcePtr`] is the shared, read-only handle callers hold
//!
//! ## Features
//!
//! - `tracing` (default): cache hits, loads, evictions, clears and load failures are
//!   reported as `tracing` events.
//! - `proptest`: exposes `resource::strategies` for property testing key identities.
//!
//! ## Example
//!
//! ```rust
//! use hoard::resource::KeyParam;
//! use hoard::{LoadError, ResourceKey, ResourceManager};
//!
//! struct Texture {
//!     width: u32,
//!     height: u32,
//! }
//!
//! let textures = ResourceManager::with_label("textures");
//! let key = ResourceKey::from_parameters("Size", [KeyParam::from(64u32), KeyParam::from(32u32)], "", || {
//!     Ok(Texture { width: 64, height: 32 })
//! });
//!
//! let a = textures.acquire(&key)?;
//! let b = textures.acquire(&key)?;
//! assert!(a == b);
//! assert_eq!(a.width * b.height, 2048);
//! assert_eq!(textures.use_count(&key), 2);
//!
//! drop(a);
//! drop(b);
//! assert!(!textures.contains(&key));
//! # Ok::<(), LoadError>(())
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod error;
mod macros;
pub mod ptr;
pub mod resource;

pub use error::LoadError;
pub use ptr::{DuplicationPolicy, ExclusiveHandle, OwnershipCell, PolicyHandle, TransferHandle};
pub use resource::{KeyIdentity, ResourceKey, ResourceManager, ResourcePtr};

// Compile-time assertions for memory layout
const _: () = {
    use core::mem;

    // The single-owner handles are thin wrappers around the cell.
    assert!(mem::size_of::<ExclusiveHandle<u64>>() == mem::size_of::<OwnershipCell<u64>>());
    assert!(mem::size_of::<TransferHandle<u64>>() == mem::size_of::<OwnershipCell<u64>>());

    // A cell is the value pointer plus the disposal; loose bound to stay portable.
    assert!(mem::size_of::<OwnershipCell<u64>>() <= mem::size_of::<usize>() * 3);

    // A resource handle is one fat pointer, with the empty state in its niche.
    assert!(mem::size_of::<ResourcePtr<u64>>() == mem::size_of::<usize>() * 2);
};
