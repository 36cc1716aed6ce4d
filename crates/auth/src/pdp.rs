//! Policy decision point.
//!
//! - No IO
//! - No panics on caller input
//! - Deterministic: the same request always yields the same decision

use chrono::{DateTime, Utc};

use tierguard_core::{
    DataAccessContext, DomainError, DomainResult, Entity, EntityId, IdentityCache, UserId,
};

use crate::decision::{Decision, TraceStep, Verdict};
use crate::directory::ContextDirectory;
use crate::events::{
    AccessEvent, CredentialUpdated, PermissionAssigned, PermissionRevoked, RoleParentAssigned,
};
use crate::rules::{
    AuthorizationCheckBusinessRule, AuthorizationCheckContext, BusinessRule,
    CredentialValidationBusinessRule, CredentialValidationContext,
    PermissionAssignmentBusinessRule, PermissionAssignmentContext, RoleInheritanceBusinessRule,
    RoleInheritanceContext, RuleVerdict,
};
use crate::{
    Actor, Credential, PermissionAction, PermissionGrant, PolicyConfig, RoleCatalog,
    RoleDefinition,
};

const INPUT_STAGE: &str = "input_validation";
const LOOKUP_STAGE: &str = "context_lookup";

/// A state change governed by its own business rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateTransition {
    AssignPermission(PermissionGrant),
    RevokePermission(PermissionGrant),
    SetRoleParent {
        role: RoleDefinition,
        parent: EntityId,
        /// Known roles the new lineage is checked against.
        catalog: RoleCatalog,
    },
    UpdateCredential(Credential),
}

impl StateTransition {
    /// The action the actor must hold on the target resource.
    pub fn required_action(&self) -> PermissionAction {
        match self {
            StateTransition::AssignPermission(_)
            | StateTransition::RevokePermission(_)
            | StateTransition::SetRoleParent { .. } => PermissionAction::Manage,
            StateTransition::UpdateCredential(_) => PermissionAction::Update,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StateTransition::AssignPermission(_) => "assign_permission",
            StateTransition::RevokePermission(_) => "revoke_permission",
            StateTransition::SetRoleParent { .. } => "set_role_parent",
            StateTransition::UpdateCredential(_) => "update_credential",
        }
    }

    fn event(&self, actor: &Actor, occurred_at: DateTime<Utc>) -> AccessEvent {
        match self {
            StateTransition::AssignPermission(grant) => {
                AccessEvent::PermissionAssigned(PermissionAssigned {
                    assigned_by: actor.identity.clone(),
                    grantee: grant.grantee.clone(),
                    grantee_context: grant.grantee_context.clone(),
                    scope: grant.scope,
                    actions: grant.actions.clone(),
                    occurred_at,
                })
            }
            StateTransition::RevokePermission(grant) => {
                AccessEvent::PermissionRevoked(PermissionRevoked {
                    revoked_by: actor.identity.clone(),
                    grantee: grant.grantee.clone(),
                    grantee_context: grant.grantee_context.clone(),
                    scope: grant.scope,
                    actions: grant.actions.clone(),
                    occurred_at,
                })
            }
            StateTransition::SetRoleParent { role, parent, .. } => {
                AccessEvent::RoleParentAssigned(RoleParentAssigned {
                    assigned_by: actor.identity.clone(),
                    tenant_id: actor.isolation_context.tenant_id().cloned(),
                    role_id: role.id().clone(),
                    parent_id: parent.clone(),
                    occurred_at,
                })
            }
            StateTransition::UpdateCredential(credential) => {
                AccessEvent::CredentialUpdated(CredentialUpdated {
                    updated_by: actor.identity.clone(),
                    credential_id: credential.id.clone(),
                    credential_type: credential.credential_type,
                    owner: credential.owner.clone(),
                    occurred_at,
                })
            }
        }
    }
}

/// Everything a decision depends on.
///
/// `evaluated_at` is supplied by the caller so decisions stay reproducible;
/// it is also the `occurred_at` of any produced event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    actor: Actor,
    action: PermissionAction,
    resource: DataAccessContext,
    transition: Option<StateTransition>,
    evaluated_at: DateTime<Utc>,
}

impl AccessRequest {
    /// A plain access check with no state change.
    pub fn new(
        actor: Actor,
        action: PermissionAction,
        resource: DataAccessContext,
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            actor,
            action,
            resource,
            transition: None,
            evaluated_at,
        }
    }

    /// A state change on `resource`; the transition dictates the action.
    pub fn governed(
        actor: Actor,
        resource: DataAccessContext,
        transition: StateTransition,
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            actor,
            action: transition.required_action(),
            resource,
            transition: Some(transition),
            evaluated_at,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn action(&self) -> PermissionAction {
        self.action
    }

    pub fn resource(&self) -> &DataAccessContext {
        &self.resource
    }

    pub fn transition(&self) -> Option<&StateTransition> {
        self.transition.as_ref()
    }

    pub fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }
}

/// Combines the business rules into one verdict.
///
/// 1. validate actor and resource; malformed input is INDETERMINATE
/// 2. run the authorization check
/// 3. run the rule of the governed transition, if any
/// 4. ALLOW only if every rule passed, with the transition's event
///
/// Every applicable rule runs; reasons of all failing rules are concatenated
/// in that order. A structural error in any stage makes the whole decision
/// INDETERMINATE, and otherwise any failing rule makes it DENY.
#[derive(Debug, Clone)]
pub struct PolicyDecisionPoint {
    config: PolicyConfig,
    authorization: AuthorizationCheckBusinessRule,
    assignment: PermissionAssignmentBusinessRule,
    inheritance: RoleInheritanceBusinessRule,
    credentials: CredentialValidationBusinessRule,
}

impl Default for PolicyDecisionPoint {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

impl PolicyDecisionPoint {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            authorization: AuthorizationCheckBusinessRule::new(config.sharing_override),
            assignment: PermissionAssignmentBusinessRule::new(),
            inheritance: RoleInheritanceBusinessRule::new(config.max_role_depth),
            credentials: CredentialValidationBusinessRule::new(config.token_leeway()),
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn decide(&self, request: &AccessRequest) -> Decision {
        let decision = self.evaluate(request);

        assert!(
            decision.events().is_empty() || decision.is_allowed(),
            "events produced for a {} decision",
            decision.verdict()
        );

        match decision.verdict() {
            Verdict::Indeterminate => tracing::warn!(
                actor = %request.actor.identity,
                action = %request.action,
                reasons = ?decision.reasons(),
                "indeterminate policy decision"
            ),
            verdict => tracing::debug!(
                verdict = %verdict,
                actor = %request.actor.identity,
                action = %request.action,
                transition = request.transition.as_ref().map(StateTransition::name),
                reason_count = decision.reasons().len(),
                event_count = decision.events().len(),
                "policy decision"
            ),
        }

        decision
    }

    /// Resolve actor and resource through `directory`, then decide.
    ///
    /// A lookup miss is INDETERMINATE.
    pub fn decide_by_id<D>(
        &self,
        directory: &D,
        actor_id: &UserId,
        action: PermissionAction,
        resource_id: &EntityId,
        evaluated_at: DateTime<Utc>,
    ) -> Decision
    where
        D: ContextDirectory + ?Sized,
    {
        let (actor, resource) = match resolve(directory, actor_id, resource_id) {
            Ok(found) => found,
            Err(decision) => return decision,
        };
        self.decide(&AccessRequest::new(actor, action, resource, evaluated_at))
    }

    /// Like [`Self::decide_by_id`], for callers holding raw identifiers.
    ///
    /// Identifiers are canonicalized through `cache`; one that is invalid
    /// makes the decision INDETERMINATE.
    pub fn decide_by_raw_id<D>(
        &self,
        cache: &IdentityCache,
        directory: &D,
        actor_id: &str,
        action: PermissionAction,
        resource_id: &str,
        evaluated_at: DateTime<Utc>,
    ) -> Decision
    where
        D: ContextDirectory + ?Sized,
    {
        let ids = cache
            .user(actor_id)
            .and_then(|actor| Ok((actor, cache.entity(resource_id)?)));
        match ids {
            Ok((actor_id, resource_id)) => {
                self.decide_by_id(directory, &actor_id, action, &resource_id, evaluated_at)
            }
            Err(err) => {
                tracing::warn!(error = %err, "policy request carries an invalid identifier");
                structural(Vec::new(), INPUT_STAGE, &err)
            }
        }
    }

    /// Resolve everything a role re-parenting needs through `directory`, then decide.
    pub fn decide_role_parent_by_id<D>(
        &self,
        directory: &D,
        actor_id: &UserId,
        role_id: &EntityId,
        parent_id: &EntityId,
        resource_id: &EntityId,
        evaluated_at: DateTime<Utc>,
    ) -> Decision
    where
        D: ContextDirectory + ?Sized,
    {
        let (actor, resource) = match resolve(directory, actor_id, resource_id) {
            Ok(found) => found,
            Err(decision) => return decision,
        };
        let Some(role) = directory.role(role_id) else {
            return unresolved(format!("unknown role '{role_id}'"));
        };

        let transition = StateTransition::SetRoleParent {
            role,
            parent: parent_id.clone(),
            catalog: directory.roles(),
        };
        self.decide(&AccessRequest::governed(actor, resource, transition, evaluated_at))
    }

    fn evaluate(&self, request: &AccessRequest) -> Decision {
        let mut trace = Vec::new();

        let input = request
            .actor
            .validate()
            .and_then(|()| request.resource.validate());
        if let Err(err) = input {
            return structural(trace, INPUT_STAGE, &err);
        }
        trace.push(TraceStep::ok(INPUT_STAGE));

        let mut verdicts: Vec<RuleVerdict> = Vec::with_capacity(2);

        let authorization = AuthorizationCheckContext {
            actor: request.actor.clone(),
            action: request.action,
            resource: request.resource.clone(),
        };
        match self.authorization.validate(&authorization) {
            Ok(verdict) => verdicts.push(verdict),
            Err(err) => return structural(trace, self.authorization.name(), &err),
        }

        if let Some(transition) = &request.transition {
            match self.check_transition(&request.actor, transition, request.evaluated_at) {
                (_, Ok(verdict)) => verdicts.push(verdict),
                (stage, Err(err)) => {
                    trace.extend(verdicts.iter().map(TraceStep::from_verdict));
                    return structural(trace, stage, &err);
                }
            }
        }

        trace.extend(verdicts.iter().map(TraceStep::from_verdict));
        let reasons: Vec<String> = verdicts.iter().flat_map(RuleVerdict::reasons).collect();
        if !reasons.is_empty() {
            return Decision::deny(reasons, trace);
        }

        let events = request
            .transition
            .iter()
            .map(|t| t.event(&request.actor, request.evaluated_at))
            .collect();
        Decision::allow(events, trace)
    }

    fn check_transition(
        &self,
        actor: &Actor,
        transition: &StateTransition,
        now: DateTime<Utc>,
    ) -> (&'static str, DomainResult<RuleVerdict>) {
        match transition {
            StateTransition::AssignPermission(grant) | StateTransition::RevokePermission(grant) => {
                let context = PermissionAssignmentContext {
                    assigner: actor.clone(),
                    grant: grant.clone(),
                };
                (self.assignment.name(), self.assignment.validate(&context))
            }
            StateTransition::SetRoleParent {
                role,
                parent,
                catalog,
            } => {
                let context = RoleInheritanceContext {
                    role: role.clone().with_parent(parent.clone()),
                    catalog: catalog.clone(),
                };
                (self.inheritance.name(), self.inheritance.validate(&context))
            }
            StateTransition::UpdateCredential(credential) => {
                let context = CredentialValidationContext {
                    credential: credential.clone(),
                    validator: actor.isolation_context.clone(),
                    now,
                };
                (self.credentials.name(), self.credentials.validate(&context))
            }
        }
    }
}

fn resolve<D>(
    directory: &D,
    actor_id: &UserId,
    resource_id: &EntityId,
) -> Result<(Actor, DataAccessContext), Decision>
where
    D: ContextDirectory + ?Sized,
{
    let actor = directory
        .actor(actor_id)
        .ok_or_else(|| unresolved(format!("unknown actor '{actor_id}'")))?;
    let resource = directory
        .resource(resource_id)
        .ok_or_else(|| unresolved(format!("unknown resource '{resource_id}'")))?;
    Ok((actor, resource))
}

fn structural(mut trace: Vec<TraceStep>, stage: &'static str, err: &DomainError) -> Decision {
    trace.push(TraceStep::structural(stage, err));
    Decision::indeterminate(vec![err.to_string()], trace)
}

fn unresolved(reason: String) -> Decision {
    tracing::warn!(%reason, "policy context lookup failed");
    let step = TraceStep::unresolved(LOOKUP_STAGE, reason.clone());
    Decision::indeterminate(vec![reason], vec![step])
}
