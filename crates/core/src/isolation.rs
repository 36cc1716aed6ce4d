//! The five-tier data-isolation hierarchy.
//!
//! `PLATFORM ⊇ TENANT ⊇ ORGANIZATION ⊇ DEPARTMENT ⊇ USER`. An
//! [`IsolationContext`] names one node of that tree by carrying the
//! identifiers of every tier from the tenant down to its own level, and
//! nothing below. [`contains`] is the only comparison primitive; every
//! cross-boundary check reduces to it.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{DepartmentId, IdentityRef, OrganizationId, TenantId, UserId};
use crate::value_object::ValueObject;

/// Isolation tier, ordered from broadest to narrowest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    Platform,
    Tenant,
    Organization,
    Department,
    User,
}

impl IsolationLevel {
    pub const ALL: [IsolationLevel; 5] = [
        IsolationLevel::Platform,
        IsolationLevel::Tenant,
        IsolationLevel::Organization,
        IsolationLevel::Department,
        IsolationLevel::User,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IsolationLevel::Platform => "platform",
            IsolationLevel::Tenant => "tenant",
            IsolationLevel::Organization => "organization",
            IsolationLevel::Department => "department",
            IsolationLevel::User => "user",
        }
    }

    /// `self ⊇ other` in the containment order.
    pub fn is_broader_or_equal(self, other: IsolationLevel) -> bool {
        self <= other
    }

    pub fn is_narrower_than(self, other: IsolationLevel) -> bool {
        self > other
    }

    /// The broader of the two levels.
    pub fn broadest(self, other: IsolationLevel) -> IsolationLevel {
        self.min(other)
    }
}

impl core::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a piece of data or an actor lives in the hierarchy.
///
/// # Invariants
/// A context at level `L` carries exactly the identifiers of the tiers
/// broader-or-equal to `L` (the platform tier has none). The typed
/// constructors always uphold this; [`IsolationContext::from_parts`] accepts
/// arbitrary collaborator input and must be checked with
/// [`IsolationContext::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IsolationContext {
    level: IsolationLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant_id: Option<TenantId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    organization_id: Option<OrganizationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    department_id: Option<DepartmentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,
}

impl ValueObject for IsolationContext {}

impl IsolationContext {
    pub fn platform() -> Self {
        Self::from_parts(IsolationLevel::Platform, None, None, None, None)
    }

    pub fn tenant(tenant_id: TenantId) -> Self {
        Self::from_parts(IsolationLevel::Tenant, Some(tenant_id), None, None, None)
    }

    pub fn organization(tenant_id: TenantId, organization_id: OrganizationId) -> Self {
        Self::from_parts(
            IsolationLevel::Organization,
            Some(tenant_id),
            Some(organization_id),
            None,
            None,
        )
    }

    pub fn department(
        tenant_id: TenantId,
        organization_id: OrganizationId,
        department_id: DepartmentId,
    ) -> Self {
        Self::from_parts(
            IsolationLevel::Department,
            Some(tenant_id),
            Some(organization_id),
            Some(department_id),
            None,
        )
    }

    pub fn user(
        tenant_id: TenantId,
        organization_id: OrganizationId,
        department_id: DepartmentId,
        user_id: UserId,
    ) -> Self {
        Self::from_parts(
            IsolationLevel::User,
            Some(tenant_id),
            Some(organization_id),
            Some(department_id),
            Some(user_id),
        )
    }

    /// Assemble a context from loose parts without checking the presence invariant.
    pub fn from_parts(
        level: IsolationLevel,
        tenant_id: Option<TenantId>,
        organization_id: Option<OrganizationId>,
        department_id: Option<DepartmentId>,
        user_id: Option<UserId>,
    ) -> Self {
        Self {
            level,
            tenant_id,
            organization_id,
            department_id,
            user_id,
        }
    }

    pub fn level(&self) -> IsolationLevel {
        self.level
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    pub fn organization_id(&self) -> Option<&OrganizationId> {
        self.organization_id.as_ref()
    }

    pub fn department_id(&self) -> Option<&DepartmentId> {
        self.department_id.as_ref()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// Check the presence invariant.
    pub fn validate(&self) -> DomainResult<()> {
        let tiers = [
            (IsolationLevel::Tenant, self.tenant_id.is_some(), "tenant_id"),
            (
                IsolationLevel::Organization,
                self.organization_id.is_some(),
                "organization_id",
            ),
            (
                IsolationLevel::Department,
                self.department_id.is_some(),
                "department_id",
            ),
            (IsolationLevel::User, self.user_id.is_some(), "user_id"),
        ];

        for (tier, present, field) in tiers {
            let required = tier.is_broader_or_equal(self.level);
            if required && !present {
                return Err(DomainError::malformed_context(
                    self.level,
                    format!("missing {field}"),
                ));
            }
            if !required && present {
                return Err(DomainError::malformed_context(
                    self.level,
                    format!("unexpected {field} below the context level"),
                ));
            }
        }
        Ok(())
    }

    /// This context truncated to a broader (or equal) level.
    ///
    /// Returns `None` when `level` is narrower than the context itself, since
    /// the missing identifiers cannot be invented.
    pub fn ancestor_at(&self, level: IsolationLevel) -> Option<IsolationContext> {
        if level.is_narrower_than(self.level) {
            return None;
        }
        let keep = |tier: IsolationLevel| tier.is_broader_or_equal(level);
        Some(Self {
            level,
            tenant_id: self.tenant_id.clone().filter(|_| keep(IsolationLevel::Tenant)),
            organization_id: self
                .organization_id
                .clone()
                .filter(|_| keep(IsolationLevel::Organization)),
            department_id: self
                .department_id
                .clone()
                .filter(|_| keep(IsolationLevel::Department)),
            user_id: self.user_id.clone().filter(|_| keep(IsolationLevel::User)),
        })
    }

    /// See [`contains`].
    pub fn contains(&self, inner: &IsolationContext) -> bool {
        contains(self, inner)
    }

    /// True when `id` names this context or one of its ancestors.
    pub fn is_within(&self, id: &IdentityRef) -> bool {
        match id {
            IdentityRef::Tenant(t) => self.tenant_id.as_ref() == Some(t),
            IdentityRef::Organization(o) => self.organization_id.as_ref() == Some(o),
            IdentityRef::Department(d) => self.department_id.as_ref() == Some(d),
            IdentityRef::User(u) => self.user_id.as_ref() == Some(u),
            IdentityRef::Entity(_) => false,
        }
    }
}

/// `inner` lies at or below `outer` in the hierarchy.
///
/// `outer.level` must be broader-or-equal to `inner.level`, and every
/// identifier present in `outer` must equal the one in `inner`.
pub fn contains(outer: &IsolationContext, inner: &IsolationContext) -> bool {
    outer.level.is_broader_or_equal(inner.level) && divergence(outer, inner).is_none()
}

/// First tier at which `inner` leaves the path described by `outer`.
///
/// Only identifiers present in `outer` are compared; levels are ignored.
pub fn divergence(outer: &IsolationContext, inner: &IsolationContext) -> Option<IsolationLevel> {
    fn differs<T: PartialEq>(outer: &Option<T>, inner: &Option<T>) -> bool {
        outer.is_some() && outer != inner
    }

    if differs(&outer.tenant_id, &inner.tenant_id) {
        Some(IsolationLevel::Tenant)
    } else if differs(&outer.organization_id, &inner.organization_id) {
        Some(IsolationLevel::Organization)
    } else if differs(&outer.department_id, &inner.department_id) {
        Some(IsolationLevel::Department)
    } else if differs(&outer.user_id, &inner.user_id) {
        Some(IsolationLevel::User)
    } else {
        None
    }
}

/// Isolation context of a piece of data plus its sharing settings.
///
/// # Invariants
/// - `sharing_level`, when present, is broader-or-equal to the isolation level.
/// - `shared_with` keeps insertion order and holds no duplicates; it is only
///   consulted while `is_shared` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataAccessContext {
    isolation: IsolationContext,
    is_shared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sharing_level: Option<IsolationLevel>,
    shared_with: Vec<IdentityRef>,
}

impl ValueObject for DataAccessContext {}

impl DataAccessContext {
    /// Private (unshared) data.
    pub fn new(isolation: IsolationContext) -> Self {
        Self {
            isolation,
            is_shared: false,
            sharing_level: None,
            shared_with: Vec::new(),
        }
    }

    /// Assemble from loose collaborator input; checked by [`DataAccessContext::validate`].
    pub fn from_parts(
        isolation: IsolationContext,
        is_shared: bool,
        sharing_level: Option<IsolationLevel>,
        shared_with: impl IntoIterator<Item = IdentityRef>,
    ) -> Self {
        let mut ctx = Self {
            isolation,
            is_shared,
            sharing_level,
            shared_with: Vec::new(),
        };
        for id in shared_with {
            ctx.push_shared(id);
        }
        ctx
    }

    /// Share with everyone under this data's ancestor at `level`.
    pub fn with_sharing_level(mut self, level: IsolationLevel) -> Self {
        self.is_shared = true;
        self.sharing_level = Some(level);
        self
    }

    /// Share with an explicit identity (a user, or every member of a tenant,
    /// organization or department).
    pub fn share_with(mut self, id: impl Into<IdentityRef>) -> Self {
        self.is_shared = true;
        self.push_shared(id.into());
        self
    }

    fn push_shared(&mut self, id: IdentityRef) {
        if !self.shared_with.contains(&id) {
            self.shared_with.push(id);
        }
    }

    pub fn isolation(&self) -> &IsolationContext {
        &self.isolation
    }

    pub fn level(&self) -> IsolationLevel {
        self.isolation.level()
    }

    pub fn is_shared(&self) -> bool {
        self.is_shared
    }

    pub fn sharing_level(&self) -> Option<IsolationLevel> {
        self.sharing_level
    }

    pub fn shared_with(&self) -> &[IdentityRef] {
        &self.shared_with
    }

    pub fn validate(&self) -> DomainResult<()> {
        self.isolation.validate()?;
        if let Some(sharing) = self.sharing_level {
            if sharing.is_narrower_than(self.isolation.level()) {
                return Err(DomainError::malformed_access(format!(
                    "sharing level {sharing} is narrower than the data's {} level",
                    self.isolation.level()
                )));
            }
        }
        Ok(())
    }

    /// Whether the sharing settings grant access to `actor` living at `actor_context`.
    pub fn is_shared_with(&self, actor: &UserId, actor_context: &IsolationContext) -> bool {
        if !self.is_shared {
            return false;
        }

        let explicit = self.shared_with.iter().any(|id| match id {
            IdentityRef::User(u) => u == actor,
            other => actor_context.is_within(other),
        });
        if explicit {
            return true;
        }

        self.sharing_level
            .and_then(|level| self.isolation.ancestor_at(level))
            .is_some_and(|scope| scope.contains(actor_context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdentityCache;

    struct Fixture {
        cache: IdentityCache,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                cache: IdentityCache::new(),
            }
        }

        fn dept(&self, t: &str, o: &str, d: &str) -> IsolationContext {
            IsolationContext::department(
                self.cache.tenant(t).unwrap(),
                self.cache.organization(o).unwrap(),
                self.cache.department(d).unwrap(),
            )
        }

        fn user_ctx(&self, t: &str, o: &str, d: &str, u: &str) -> IsolationContext {
            IsolationContext::user(
                self.cache.tenant(t).unwrap(),
                self.cache.organization(o).unwrap(),
                self.cache.department(d).unwrap(),
                self.cache.user(u).unwrap(),
            )
        }
    }

    #[test]
    fn levels_are_ordered_broadest_first() {
        assert!(IsolationLevel::Platform.is_broader_or_equal(IsolationLevel::User));
        assert!(IsolationLevel::Tenant.is_broader_or_equal(IsolationLevel::Tenant));
        assert!(IsolationLevel::User.is_narrower_than(IsolationLevel::Department));
        assert_eq!(
            IsolationLevel::Organization.broadest(IsolationLevel::Tenant),
            IsolationLevel::Tenant
        );
    }

    #[test]
    fn typed_constructors_are_valid() {
        let fx = Fixture::new();
        assert!(IsolationContext::platform().validate().is_ok());
        assert!(fx.dept("t1", "o1", "d1").validate().is_ok());
        assert!(fx.user_ctx("t1", "o1", "d1", "u1").validate().is_ok());
    }

    #[test]
    fn department_without_organization_is_malformed() {
        let fx = Fixture::new();
        let ctx = IsolationContext::from_parts(
            IsolationLevel::Department,
            Some(fx.cache.tenant("t1").unwrap()),
            None,
            Some(fx.cache.department("d1").unwrap()),
            None,
        );

        let err = ctx.validate().unwrap_err();
        assert_eq!(
            err,
            DomainError::malformed_context(IsolationLevel::Department, "missing organization_id")
        );
    }

    #[test]
    fn identifiers_below_the_level_are_malformed() {
        let fx = Fixture::new();
        let ctx = IsolationContext::from_parts(
            IsolationLevel::Tenant,
            Some(fx.cache.tenant("t1").unwrap()),
            None,
            None,
            Some(fx.cache.user("u1").unwrap()),
        );
        assert!(ctx.validate().unwrap_err().to_string().contains("unexpected user_id"));
    }

    #[test]
    fn tenant_contains_its_departments_only() {
        let fx = Fixture::new();
        let tenant = IsolationContext::tenant(fx.cache.tenant("t1").unwrap());

        assert!(contains(&tenant, &fx.dept("t1", "o1", "d1")));
        assert!(!contains(&tenant, &fx.dept("t2", "o1", "d1")));
        assert!(!contains(&fx.dept("t1", "o1", "d1"), &tenant));
        assert!(contains(&IsolationContext::platform(), &tenant));
    }

    #[test]
    fn divergence_reports_first_differing_tier() {
        let fx = Fixture::new();
        let a = fx.dept("t1", "o1", "d1");

        assert_eq!(divergence(&a, &fx.dept("t2", "o2", "d2")), Some(IsolationLevel::Tenant));
        assert_eq!(
            divergence(&a, &fx.dept("t1", "o2", "d1")),
            Some(IsolationLevel::Organization)
        );
        assert_eq!(divergence(&a, &fx.user_ctx("t1", "o1", "d1", "u1")), None);
    }

    #[test]
    fn ancestor_truncates_narrower_identifiers() {
        let fx = Fixture::new();
        let user = fx.user_ctx("t1", "o1", "d1", "u1");

        let org = user.ancestor_at(IsolationLevel::Organization).unwrap();
        assert_eq!(org.level(), IsolationLevel::Organization);
        assert!(org.department_id().is_none());
        assert!(org.validate().is_ok());

        let tenant = IsolationContext::tenant(fx.cache.tenant("t1").unwrap());
        assert!(tenant.ancestor_at(IsolationLevel::User).is_none());
    }

    #[test]
    fn sharing_level_must_not_be_narrower_than_the_data() {
        let fx = Fixture::new();
        let data = DataAccessContext::new(fx.dept("t1", "o1", "d1"))
            .with_sharing_level(IsolationLevel::User);

        let err = data.validate().unwrap_err();
        assert!(matches!(err, DomainError::MalformedDataAccessContext { .. }));
    }

    #[test]
    fn shared_with_is_an_ordered_set() {
        let fx = Fixture::new();
        let alice = fx.cache.user("alice").unwrap();
        let bob = fx.cache.user("bob").unwrap();
        let data = DataAccessContext::new(fx.dept("t1", "o1", "d1"))
            .share_with(bob.clone())
            .share_with(alice.clone())
            .share_with(bob.clone());

        assert_eq!(
            data.shared_with(),
            &[IdentityRef::User(bob), IdentityRef::User(alice)]
        );
    }

    #[test]
    fn explicit_and_level_sharing_grant_access() {
        let fx = Fixture::new();
        let outsider_ctx = fx.user_ctx("t2", "o9", "d9", "mallory");
        let outsider = fx.cache.user("mallory").unwrap();

        let private = DataAccessContext::new(fx.dept("t1", "o1", "d1"));
        assert!(!private.is_shared_with(&outsider, &outsider_ctx));

        let by_user = private.clone().share_with(outsider.clone());
        assert!(by_user.is_shared_with(&outsider, &outsider_ctx));

        let by_tenant = private.clone().share_with(fx.cache.tenant("t2").unwrap());
        assert!(by_tenant.is_shared_with(&outsider, &outsider_ctx));

        let colleague_ctx = fx.user_ctx("t1", "o1", "d7", "carol");
        let colleague = fx.cache.user("carol").unwrap();
        let by_org = private.with_sharing_level(IsolationLevel::Organization);
        assert!(by_org.is_shared_with(&colleague, &colleague_ctx));
        assert!(!by_org.is_shared_with(&outsider, &outsider_ctx));
    }

    #[test]
    fn shared_with_is_ignored_while_not_shared() {
        let fx = Fixture::new();
        let user = fx.cache.user("u1").unwrap();
        let data = DataAccessContext::from_parts(
            fx.dept("t1", "o1", "d1"),
            false,
            None,
            [IdentityRef::User(user.clone())],
        );
        assert!(!data.is_shared_with(&user, &fx.user_ctx("t2", "o2", "d2", "u1")));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn build(cache: &IdentityCache, level: usize, path: &[String; 4]) -> IsolationContext {
            let full = IsolationContext::user(
                cache.tenant(&path[0]).unwrap(),
                cache.organization(&path[1]).unwrap(),
                cache.department(&path[2]).unwrap(),
                cache.user(&path[3]).unwrap(),
            );
            full.ancestor_at(IsolationLevel::ALL[level]).unwrap()
        }

        fn path() -> impl Strategy<Value = [String; 4]> {
            ["[ab]", "[ab]", "[ab]", "[ab]"]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: contains(x, x) for every valid context.
            #[test]
            fn contains_is_reflexive(level in 0usize..5, p in path()) {
                let cache = IdentityCache::new();
                let ctx = build(&cache, level, &p);
                prop_assert!(contains(&ctx, &ctx));
            }

            /// Property: a narrower outer context never contains a broader inner one.
            #[test]
            fn contains_respects_level_order(
                outer_level in 0usize..5,
                inner_level in 0usize..5,
                a in path(),
                b in path(),
            ) {
                let cache = IdentityCache::new();
                let outer = build(&cache, outer_level, &a);
                let inner = build(&cache, inner_level, &b);
                if outer.level().is_narrower_than(inner.level()) {
                    prop_assert!(!contains(&outer, &inner));
                }
            }

            /// Property: containment is transitive.
            #[test]
            fn contains_is_transitive(
                levels in (0usize..5, 0usize..5, 0usize..5),
                a in path(),
                b in path(),
                c in path(),
            ) {
                let cache = IdentityCache::new();
                let x = build(&cache, levels.0, &a);
                let y = build(&cache, levels.1, &b);
                let z = build(&cache, levels.2, &c);
                if contains(&x, &y) && contains(&y, &z) {
                    prop_assert!(contains(&x, &z));
                }
            }
        }
    }
}
