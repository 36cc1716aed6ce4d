//! `tierguard-auth` — pure multi-tenant authorization policy engine.
//!
//! This crate is intentionally decoupled from HTTP and storage: contexts come
//! in through values or a [`ContextDirectory`], decisions and events go out as
//! values.

pub mod actor;
pub mod config;
pub mod credentials;
pub mod decision;
pub mod directory;
pub mod events;
pub mod pdp;
pub mod permissions;
pub mod roles;
pub mod rules;
pub mod specification;

pub use actor::Actor;
pub use config::PolicyConfig;
pub use credentials::{Credential, CredentialType, TokenValidationError, validate_token_window};
pub use decision::{Decision, TraceStep, Verdict};
pub use directory::{ContextDirectory, InMemoryDirectory};
pub use events::AccessEvent;
pub use pdp::{AccessRequest, PolicyDecisionPoint, StateTransition};
pub use permissions::{ActionSet, PermissionAction, PermissionGrant, PermissionScope};
pub use roles::{Lineage, RoleCatalog, RoleDefinition, RoleType};
pub use rules::{BusinessRule, RuleVerdict};
pub use specification::{Specification, SpecificationResult, Violation};
