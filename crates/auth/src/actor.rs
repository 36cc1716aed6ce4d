use serde::Serialize;

use tierguard_core::{DomainError, DomainResult, IsolationContext, IsolationLevel, UserId};

use crate::{ActionSet, PermissionScope};

/// A fully resolved actor for authorization decisions.
///
/// Construction is decoupled from storage and transport: callers resolve
/// actors from tokens or a [`crate::ContextDirectory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub identity: UserId,
    pub isolation_context: IsolationContext,
    pub granted_scope: PermissionScope,
    pub granted_actions: ActionSet,
}

impl Actor {
    pub fn new(
        identity: UserId,
        isolation_context: IsolationContext,
        granted_scope: PermissionScope,
        granted_actions: ActionSet,
    ) -> Self {
        Self {
            identity,
            isolation_context,
            granted_scope,
            granted_actions,
        }
    }

    /// The actor's context must be valid, name the actor itself when it is
    /// user-level, and lie at or below the tier of its granted scope.
    pub fn validate(&self) -> DomainResult<()> {
        self.isolation_context.validate()?;
        let level = self.isolation_context.level();
        if level == IsolationLevel::User
            && self.isolation_context.user_id() != Some(&self.identity)
        {
            return Err(DomainError::malformed_context(
                IsolationLevel::User,
                "actor identity does not match context user_id",
            ));
        }
        if self.granted_scope.covers(level) {
            return Ok(());
        }
        Err(DomainError::malformed_context(
            level,
            format!(
                "actor context is broader than its granted {} scope",
                self.granted_scope
            ),
        ))
    }

    /// The part of the hierarchy the actor's scope reaches: its own context
    /// widened to the tier of the granted scope.
    pub fn reach(&self) -> IsolationContext {
        self.isolation_context
            .ancestor_at(self.granted_scope.level())
            .unwrap_or_else(|| self.isolation_context.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierguard_core::IdentityCache;

    fn user_ctx(cache: &IdentityCache) -> IsolationContext {
        IsolationContext::user(
            cache.tenant("t1").unwrap(),
            cache.organization("o1").unwrap(),
            cache.department("d1").unwrap(),
            cache.user("u1").unwrap(),
        )
    }

    #[test]
    fn reach_widens_to_the_scope_tier() {
        let cache = IdentityCache::new();
        let actor = Actor::new(
            cache.user("u1").unwrap(),
            user_ctx(&cache),
            PermissionScope::Tenant,
            ActionSet::manage(),
        );

        let reach = actor.reach();
        assert_eq!(reach.level(), IsolationLevel::Tenant);
        assert_eq!(reach.tenant_id().map(|t| t.as_str()), Some("t1"));
        assert!(actor.validate().is_ok());
    }

    #[test]
    fn context_broader_than_scope_is_rejected() {
        let cache = IdentityCache::new();
        let actor = Actor::new(
            cache.user("u1").unwrap(),
            IsolationContext::tenant(cache.tenant("t1").unwrap()),
            PermissionScope::User,
            ActionSet::manage(),
        );

        let err = actor.validate().unwrap_err();
        assert!(err.to_string().contains("broader than its granted user scope"));
    }

    #[test]
    fn context_of_another_user_is_rejected() {
        let cache = IdentityCache::new();
        let actor = Actor::new(
            cache.user("mallory").unwrap(),
            user_ctx(&cache),
            PermissionScope::User,
            ActionSet::manage(),
        );

        let err = actor.validate().unwrap_err();
        assert!(matches!(
            err,
            DomainError::MalformedIsolationContext {
                level: IsolationLevel::User,
                ..
            }
        ));
    }
}
