use std::borrow::Cow;

use tierguard_core::{DataAccessContext, DomainResult};

use crate::specification::Specification;
use crate::{Actor, PermissionAction};

use super::{BusinessRule, RuleVerdict, containment};

/// Input of [`AuthorizationCheckBusinessRule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCheckContext {
    pub actor: Actor,
    pub action: PermissionAction,
    pub resource: DataAccessContext,
}

/// The umbrella access rule.
///
/// Passes only when
/// 1. the actor's scope reaches the resource's isolation level,
/// 2. the resource lies within the actor's reach, or is shared with the actor,
/// 3. the requested action is granted (`Manage` grants everything).
///
/// Sharing can only stand in for (2); it never lifts (1) or (3).
#[derive(Debug, Clone)]
pub struct AuthorizationCheckBusinessRule {
    spec: Specification<AuthorizationCheckContext>,
}

impl AuthorizationCheckBusinessRule {
    pub const NAME: &'static str = "authorization_check";

    /// `sharing_override` enables (2)'s sharing alternative.
    pub fn new(sharing_override: bool) -> Self {
        let scope = Specification::leaf(
            "scope_covers_resource",
            "actor scope is narrower than the resource isolation level",
            |ctx: &AuthorizationCheckContext| ctx.actor.granted_scope.covers(ctx.resource.level()),
        );

        let contained = containment(
            |ctx: &AuthorizationCheckContext| {
                (
                    Cow::Owned(ctx.actor.reach()),
                    Cow::Borrowed(ctx.resource.isolation()),
                )
            },
            "resource lies above the actor's isolation context",
        );

        let reachable = if sharing_override {
            contained.or(Specification::leaf(
                "shared_with_actor",
                "resource is not shared with the actor",
                |ctx: &AuthorizationCheckContext| {
                    ctx.resource
                        .is_shared_with(&ctx.actor.identity, &ctx.actor.isolation_context)
                },
            ))
        } else {
            contained
        };

        let action = Specification::leaf(
            "action_granted",
            "requested action is not granted to the actor",
            |ctx: &AuthorizationCheckContext| ctx.actor.granted_actions.permits(ctx.action),
        );

        Self {
            spec: scope.and(reachable).and(action),
        }
    }
}

impl Default for AuthorizationCheckBusinessRule {
    fn default() -> Self {
        Self::new(true)
    }
}

impl BusinessRule for AuthorizationCheckBusinessRule {
    type Context = AuthorizationCheckContext;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, context: &Self::Context) -> DomainResult<RuleVerdict> {
        context.actor.validate()?;
        context.resource.validate()?;
        Ok(RuleVerdict::new(Self::NAME, self.spec.is_satisfied_by(context)))
    }
}
