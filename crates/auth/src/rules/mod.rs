//! Business rules built from specifications.
//!
//! Every rule returns `Ok(verdict)` for expected outcomes, pass or fail, and
//! `Err` only for malformed input.

use std::borrow::Cow;
use std::sync::Arc;

use serde::Serialize;

use tierguard_core::{DomainResult, IsolationContext, IsolationLevel, divergence};

use crate::specification::{Specification, SpecificationResult, Violation};

pub mod authorization_check;
pub mod credential_validation;
pub mod permission_assignment;
pub mod role_inheritance;

pub use authorization_check::{AuthorizationCheckBusinessRule, AuthorizationCheckContext};
pub use credential_validation::{CredentialValidationBusinessRule, CredentialValidationContext};
pub use permission_assignment::{PermissionAssignmentBusinessRule, PermissionAssignmentContext};
pub use role_inheritance::{RoleInheritanceBusinessRule, RoleInheritanceContext};

/// A named validator bound to one context type.
pub trait BusinessRule {
    type Context;

    /// Stable rule identifier, used in traces.
    fn name(&self) -> &'static str;

    fn validate(&self, context: &Self::Context) -> DomainResult<RuleVerdict>;
}

/// Pass/fail outcome of a business rule. Passed iff no violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleVerdict {
    rule: &'static str,
    violations: Vec<Violation>,
}

impl RuleVerdict {
    pub fn new(rule: &'static str, result: SpecificationResult) -> Self {
        Self {
            rule,
            violations: result.into_violations(),
        }
    }

    /// Verdict over several independently evaluated specifications.
    pub fn from_results(
        rule: &'static str,
        results: impl IntoIterator<Item = SpecificationResult>,
    ) -> Self {
        Self {
            rule,
            violations: results
                .into_iter()
                .flat_map(SpecificationResult::into_violations)
                .collect(),
        }
    }

    pub fn rule(&self) -> &'static str {
        self.rule
    }

    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Human-readable reasons, in evaluation order.
    pub fn reasons(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message.to_string()).collect()
    }

    pub fn has_reason(&self, reason: &str) -> bool {
        self.violations.iter().any(|v| v.message == reason)
    }
}

/// Reason reported when a path leaves another at `tier`.
pub fn cross_boundary_reason(tier: IsolationLevel) -> &'static str {
    match tier {
        IsolationLevel::Platform => "cross-platform access",
        IsolationLevel::Tenant => "cross-tenant access",
        IsolationLevel::Organization => "cross-organization access",
        IsolationLevel::Department => "cross-department access",
        IsolationLevel::User => "cross-user access",
    }
}

/// `inner ⊆ outer` as a specification: the level order, then one leaf per tier.
///
/// `project` picks or derives `(outer, inner)` from the subject. A foreign
/// path is reported by the broadest tier at which it leaves `outer`.
pub(crate) fn containment<T, F>(project: F, above_message: &'static str) -> Specification<T>
where
    T: 'static,
    F: Fn(&T) -> (Cow<'_, IsolationContext>, Cow<'_, IsolationContext>) + Send + Sync + 'static,
{
    let project = Arc::new(project);

    let tiers = [
        IsolationLevel::Tenant,
        IsolationLevel::Organization,
        IsolationLevel::Department,
        IsolationLevel::User,
    ]
    .map(|tier| {
        let project = Arc::clone(&project);
        Specification::leaf(
            format!("same_{tier}"),
            cross_boundary_reason(tier),
            move |subject: &T| {
                let (outer, inner) = (*project)(subject);
                divergence(&outer, &inner) != Some(tier)
            },
        )
    });

    let level = Specification::leaf("level_contained", above_message, move |subject: &T| {
        let (outer, inner) = (*project)(subject);
        outer.level().is_broader_or_equal(inner.level())
    });

    let [tenant, organization, department, user] = tiers;
    level.and(tenant.and(organization.and(department.and(user))))
}
