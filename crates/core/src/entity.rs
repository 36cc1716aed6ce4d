//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Roles and credentials are entities: two roles with the same name are still
/// distinct if their identifiers differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
