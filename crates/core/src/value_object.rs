//! Value object trait: equality by value, not identity.
//!
//! Identifiers, isolation contexts and data access contexts are all value
//! objects: they are built per request, never mutated, and two of them with
//! the same attributes describe the same place in the hierarchy.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// The trait requires:
/// - **Clone**: contexts are copied into rule inputs and decision traces
/// - **PartialEq**: comparison is by attribute values
/// - **Debug**: values show up in logs and test failures
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
