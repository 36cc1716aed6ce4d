use std::borrow::Cow;

use tierguard_core::DomainResult;

use crate::specification::Specification;
use crate::{Actor, PermissionGrant};

use super::{BusinessRule, RuleVerdict, containment};

/// Input of [`PermissionAssignmentBusinessRule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionAssignmentContext {
    pub assigner: Actor,
    pub grant: PermissionGrant,
}

/// An actor may only grant what it holds.
///
/// - the granted scope must not be broader than the assigner's scope
/// - the grantee must live within the assigner's reach
/// - the granted actions must be covered by the assigner's actions
#[derive(Debug, Clone)]
pub struct PermissionAssignmentBusinessRule {
    spec: Specification<PermissionAssignmentContext>,
}

impl PermissionAssignmentBusinessRule {
    pub const NAME: &'static str = "permission_assignment";

    pub fn new() -> Self {
        let scope = Specification::leaf(
            "scope_within_assigner",
            "scope exceeds assigner's granted scope",
            |ctx: &PermissionAssignmentContext| {
                ctx.assigner
                    .granted_scope
                    .is_broader_or_equal(ctx.grant.scope)
            },
        );

        let grantee = containment(
            |ctx: &PermissionAssignmentContext| {
                (
                    Cow::Owned(ctx.assigner.reach()),
                    Cow::Borrowed(&ctx.grant.grantee_context),
                )
            },
            "grantee lies above the assigner's isolation context",
        );

        let actions = Specification::leaf(
            "actions_within_assigner",
            "actions exceed assigner's granted actions",
            |ctx: &PermissionAssignmentContext| {
                ctx.assigner.granted_actions.covers(&ctx.grant.actions)
            },
        );

        Self {
            spec: scope.and(grantee).and(actions),
        }
    }
}

impl Default for PermissionAssignmentBusinessRule {
    fn default() -> Self {
        Self::new()
    }
}

impl BusinessRule for PermissionAssignmentBusinessRule {
    type Context = PermissionAssignmentContext;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, context: &Self::Context) -> DomainResult<RuleVerdict> {
        context.assigner.validate()?;
        context.grant.grantee_context.validate()?;
        Ok(RuleVerdict::new(Self::NAME, self.spec.is_satisfied_by(context)))
    }
}
