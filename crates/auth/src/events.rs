//! Domain events produced by allowed state-changing decisions.
//!
//! These are descriptors: the decision point returns them and the caller
//! persists and publishes them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tierguard_core::{EntityId, IsolationContext, TenantId, UserId};
use tierguard_events::{Event, TenantScoped};

use crate::{ActionSet, CredentialType, PermissionScope};

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Emitted when a permission is granted to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionAssigned {
    pub assigned_by: UserId,
    pub grantee: UserId,
    pub grantee_context: IsolationContext,
    pub scope: PermissionScope,
    pub actions: ActionSet,
    pub occurred_at: DateTime<Utc>,
}

/// Emitted when a permission is taken away from a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionRevoked {
    pub revoked_by: UserId,
    pub grantee: UserId,
    pub grantee_context: IsolationContext,
    pub scope: PermissionScope,
    pub actions: ActionSet,
    pub occurred_at: DateTime<Utc>,
}

/// Emitted when a role gains a parent to inherit from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleParentAssigned {
    pub assigned_by: UserId,
    /// Tenant of the assigning actor; `None` for platform administrators.
    pub tenant_id: Option<TenantId>,
    pub role_id: EntityId,
    pub parent_id: EntityId,
    pub occurred_at: DateTime<Utc>,
}

/// Emitted when a credential is created or replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialUpdated {
    pub updated_by: UserId,
    pub credential_id: EntityId,
    pub credential_type: CredentialType,
    pub owner: IsolationContext,
    pub occurred_at: DateTime<Utc>,
}

/// All access-control events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum AccessEvent {
    PermissionAssigned(PermissionAssigned),
    PermissionRevoked(PermissionRevoked),
    RoleParentAssigned(RoleParentAssigned),
    CredentialUpdated(CredentialUpdated),
}

impl Event for AccessEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccessEvent::PermissionAssigned(_) => "authz.permission.assigned",
            AccessEvent::PermissionRevoked(_) => "authz.permission.revoked",
            AccessEvent::RoleParentAssigned(_) => "authz.role.parent_assigned",
            AccessEvent::CredentialUpdated(_) => "authz.credential.updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccessEvent::PermissionAssigned(e) => e.occurred_at,
            AccessEvent::PermissionRevoked(e) => e.occurred_at,
            AccessEvent::RoleParentAssigned(e) => e.occurred_at,
            AccessEvent::CredentialUpdated(e) => e.occurred_at,
        }
    }
}

impl TenantScoped for AccessEvent {
    fn tenant_id(&self) -> Option<&TenantId> {
        match self {
            AccessEvent::PermissionAssigned(e) => e.grantee_context.tenant_id(),
            AccessEvent::PermissionRevoked(e) => e.grantee_context.tenant_id(),
            AccessEvent::RoleParentAssigned(e) => e.tenant_id.as_ref(),
            AccessEvent::CredentialUpdated(e) => e.owner.tenant_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PermissionAction;
    use tierguard_core::IdentityCache;

    #[test]
    fn permission_assigned_is_scoped_to_the_grantee_tenant() {
        let cache = IdentityCache::new();
        let tenant = cache.tenant("t1").unwrap();
        let event = AccessEvent::PermissionAssigned(PermissionAssigned {
            assigned_by: cache.user("admin").unwrap(),
            grantee: cache.user("bob").unwrap(),
            grantee_context: IsolationContext::tenant(tenant.clone()),
            scope: PermissionScope::Tenant,
            actions: ActionSet::new().with(PermissionAction::Read),
            occurred_at: Utc::now(),
        });

        assert_eq!(event.event_type(), "authz.permission.assigned");
        assert_eq!(event.version(), 1);
        assert!(event.belongs_to(&tenant));
        assert!(!event.belongs_to(&cache.tenant("t2").unwrap()));
    }

    #[test]
    fn serializes_with_type_tag() {
        let cache = IdentityCache::new();
        let event = AccessEvent::RoleParentAssigned(RoleParentAssigned {
            assigned_by: cache.user("root").unwrap(),
            tenant_id: None,
            role_id: cache.entity("child").unwrap(),
            parent_id: cache.entity("parent").unwrap(),
            occurred_at: Utc::now(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RoleParentAssigned");
        assert_eq!(json["data"]["parent_id"], "parent");
        assert_eq!(event.tenant_id(), None);
    }
}
