//! Entity trait: identity + continuity across state changes.

use crate::error::DomainError;
use crate::id::UserId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity whose visibility and mutation are scoped to one owning user.
pub trait Owned: Entity {
    /// The user that owns this entity (directly or through its parent).
    fn owner(&self) -> UserId;

    /// Error reported when the entity could not be resolved.
    fn not_found() -> DomainError;
}
