//! `tierguard-core` — identity and isolation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod isolation;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{
    DepartmentId, EntityId, Identity, IdentityCache, IdentityKind, IdentityRef, OrganizationId,
    TenantId, UserId,
};
pub use isolation::{DataAccessContext, IsolationContext, IsolationLevel, contains, divergence};
pub use value_object::ValueObject;
