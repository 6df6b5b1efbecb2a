//! Single-owner smart pointers built on a shared [`OwnershipCell`].
//!
//! | Type | Copy semantics | Used by |
//! |------|----------------|---------|
//! | [`ExclusiveHandle`] | not copyable | cache slots, scratch ownership |
//! | [`TransferHandle`] | moves, source left empty | loader return channel |
//! | [`PolicyHandle`] | deep copy through a [`DuplicationPolicy`] | value-semantic polymorphic fields |
//!
//! All three carry the destroy capability chosen when the value was adopted, so a
//! value can move between them without losing a custom [`Disposal`].

pub mod cell;
pub mod exclusive;
pub mod policy;
pub mod transfer;

pub use cell::{Disposal, DisposalKind, OwnershipCell};
pub use exclusive::ExclusiveHandle;
pub use policy::{
    AsAny, CustomDuplicate, Duplicate, DuplicationPolicy, DynamicDuplicate, PlainDuplicate, PolicyHandle,
    PolymorphicDuplicate,
};
pub use transfer::TransferHandle;
