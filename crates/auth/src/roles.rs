use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use tierguard_core::{DomainError, DomainResult, Entity, EntityId};

use crate::PermissionScope;

/// Role tier. Fixed tiers imply their own scope; `Custom` declares one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    Platform,
    Tenant,
    Organization,
    Department,
    User,
    Custom,
}

impl RoleType {
    pub fn fixed_scope(self) -> Option<PermissionScope> {
        match self {
            RoleType::Platform => Some(PermissionScope::Platform),
            RoleType::Tenant => Some(PermissionScope::Tenant),
            RoleType::Organization => Some(PermissionScope::Organization),
            RoleType::Department => Some(PermissionScope::Department),
            RoleType::User => Some(PermissionScope::User),
            RoleType::Custom => None,
        }
    }
}

/// Role definition with an optional parent it inherits from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDefinition {
    id: EntityId,
    name: String,
    role_type: RoleType,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_scope: Option<PermissionScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<EntityId>,
}

impl RoleDefinition {
    pub fn new(id: EntityId, name: impl Into<String>, role_type: RoleType) -> Self {
        Self {
            id,
            name: name.into(),
            role_type,
            custom_scope: None,
            parent: None,
        }
    }

    pub fn with_custom_scope(mut self, scope: PermissionScope) -> Self {
        self.custom_scope = Some(scope);
        self
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role_type(&self) -> RoleType {
        self.role_type
    }

    pub fn parent(&self) -> Option<&EntityId> {
        self.parent.as_ref()
    }

    /// Scope the role grants: the tier of a fixed role, or the declared scope
    /// of a custom one.
    pub fn implied_scope(&self) -> DomainResult<PermissionScope> {
        self.role_type
            .fixed_scope()
            .or(self.custom_scope)
            .ok_or_else(|| DomainError::missing_field("custom role", "custom_scope"))
    }
}

impl Entity for RoleDefinition {
    type Id = EntityId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Outcome of walking a role's parent chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lineage {
    /// The chain ends at a root after `depth` parents.
    Rooted { depth: usize },
    /// The chain revisits `at`.
    Cycle { at: EntityId },
    /// A parent is not present in the catalog.
    MissingParent(EntityId),
}

/// Snapshot of known roles, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCatalog {
    roles: HashMap<EntityId, RoleDefinition>,
}

impl RoleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: RoleDefinition) -> Option<RoleDefinition> {
        self.roles.insert(role.id.clone(), role)
    }

    pub fn with(mut self, role: RoleDefinition) -> Self {
        self.insert(role);
        self
    }

    pub fn get(&self, id: &EntityId) -> Option<&RoleDefinition> {
        self.roles.get(id)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleDefinition> {
        self.roles.values()
    }

    /// Walk the parents of `role`, using `role` itself in place of any
    /// catalog entry with the same id.
    pub fn lineage(&self, role: &RoleDefinition) -> Lineage {
        let mut visited: HashSet<&EntityId> = HashSet::from([&role.id]);
        let mut depth = 0;
        let mut next = role.parent.as_ref();

        while let Some(parent_id) = next {
            if visited.contains(parent_id) {
                return Lineage::Cycle {
                    at: parent_id.clone(),
                };
            }
            let Some(parent) = self.roles.get(parent_id) else {
                return Lineage::MissingParent(parent_id.clone());
            };
            visited.insert(parent_id);
            depth += 1;
            next = parent.parent.as_ref();
        }

        Lineage::Rooted { depth }
    }
}

impl FromIterator<RoleDefinition> for RoleCatalog {
    fn from_iter<I: IntoIterator<Item = RoleDefinition>>(iter: I) -> Self {
        Self {
            roles: iter.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }
}
