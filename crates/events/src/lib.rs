//! Domain event contracts.
//!
//! Events are produced by the policy layer and handed to the caller; durable
//! publication is the caller's job.

pub mod event;
pub mod tenant;

pub use event::Event;
pub use tenant::TenantScoped;
