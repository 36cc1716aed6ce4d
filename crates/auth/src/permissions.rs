use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use tierguard_core::{IsolationContext, IsolationLevel, UserId};

/// Tier at which a permission applies; mirrors [`IsolationLevel`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    Platform,
    Tenant,
    Organization,
    Department,
    User,
}

impl PermissionScope {
    pub fn level(self) -> IsolationLevel {
        match self {
            PermissionScope::Platform => IsolationLevel::Platform,
            PermissionScope::Tenant => IsolationLevel::Tenant,
            PermissionScope::Organization => IsolationLevel::Organization,
            PermissionScope::Department => IsolationLevel::Department,
            PermissionScope::User => IsolationLevel::User,
        }
    }

    pub fn from_level(level: IsolationLevel) -> Self {
        match level {
            IsolationLevel::Platform => PermissionScope::Platform,
            IsolationLevel::Tenant => PermissionScope::Tenant,
            IsolationLevel::Organization => PermissionScope::Organization,
            IsolationLevel::Department => PermissionScope::Department,
            IsolationLevel::User => PermissionScope::User,
        }
    }

    pub fn is_broader_or_equal(self, other: PermissionScope) -> bool {
        self.level().is_broader_or_equal(other.level())
    }

    /// Whether a permission at this scope reaches data living at `level`.
    pub fn covers(self, level: IsolationLevel) -> bool {
        self.level().is_broader_or_equal(level)
    }
}

impl core::fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.level(), f)
    }
}

/// Action a permission allows. `Manage` subsumes every other action.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    Create,
    Read,
    Update,
    Delete,
    Execute,
    Manage,
}

impl PermissionAction {
    pub const ALL: [PermissionAction; 6] = [
        PermissionAction::Create,
        PermissionAction::Read,
        PermissionAction::Update,
        PermissionAction::Delete,
        PermissionAction::Execute,
        PermissionAction::Manage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionAction::Create => "create",
            PermissionAction::Read => "read",
            PermissionAction::Update => "update",
            PermissionAction::Delete => "delete",
            PermissionAction::Execute => "execute",
            PermissionAction::Manage => "manage",
        }
    }

    pub fn subsumes(self, other: PermissionAction) -> bool {
        self == PermissionAction::Manage || self == other
    }
}

impl core::fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of granted actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ActionSet(BTreeSet<PermissionAction>);

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every action, expressed as `Manage`.
    pub fn manage() -> Self {
        [PermissionAction::Manage].into_iter().collect()
    }

    pub fn with(mut self, action: PermissionAction) -> Self {
        self.0.insert(action);
        self
    }

    pub fn insert(&mut self, action: PermissionAction) -> bool {
        self.0.insert(action)
    }

    pub fn contains(&self, action: PermissionAction) -> bool {
        self.0.contains(&action)
    }

    /// `Manage` permits everything; otherwise the action must be present.
    pub fn permits(&self, action: PermissionAction) -> bool {
        self.0.iter().any(|granted| granted.subsumes(action))
    }

    /// Every action of `other` is permitted by this set.
    pub fn covers(&self, other: &ActionSet) -> bool {
        other.0.iter().all(|action| self.permits(*action))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PermissionAction> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<PermissionAction> for ActionSet {
    fn from_iter<I: IntoIterator<Item = PermissionAction>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A permission being granted to (or revoked from) a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionGrant {
    pub grantee: UserId,
    pub grantee_context: IsolationContext,
    pub scope: PermissionScope,
    pub actions: ActionSet,
}
