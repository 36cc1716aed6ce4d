use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use tierguard_auth::{
    AccessRequest, ActionSet, Actor, PermissionAction, PermissionGrant, PermissionScope,
    PolicyDecisionPoint, RoleCatalog, RoleDefinition, RoleType, StateTransition,
};
use tierguard_core::{DataAccessContext, IdentityCache, IsolationContext};

fn user_ctx(cache: &IdentityCache, user: &str) -> IsolationContext {
    IsolationContext::user(
        cache.tenant("acme").unwrap(),
        cache.organization("emea").unwrap(),
        cache.department("sales").unwrap(),
        cache.user(user).unwrap(),
    )
}

fn actor(cache: &IdentityCache) -> Actor {
    Actor::new(
        cache.user("alice").unwrap(),
        user_ctx(cache, "alice"),
        PermissionScope::Organization,
        ActionSet::manage(),
    )
}

/// Plain access checks: allowed, denied by containment, denied but shared.
fn bench_access_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("access_check");
    let cache = IdentityCache::new();
    let pdp = PolicyDecisionPoint::default();
    let now = Utc::now();

    let cases = [
        (
            "same_organization",
            DataAccessContext::new(IsolationContext::department(
                cache.tenant("acme").unwrap(),
                cache.organization("emea").unwrap(),
                cache.department("finance").unwrap(),
            )),
        ),
        (
            "cross_tenant",
            DataAccessContext::new(IsolationContext::tenant(cache.tenant("globex").unwrap())),
        ),
        (
            "cross_tenant_shared",
            DataAccessContext::new(IsolationContext::tenant(cache.tenant("globex").unwrap()))
                .share_with(cache.user("alice").unwrap()),
        ),
    ];

    for (name, resource) in cases {
        let request = AccessRequest::new(actor(&cache), PermissionAction::Read, resource, now);
        group.bench_function(name, |b| {
            b.iter(|| black_box(pdp.decide(black_box(&request))));
        });
    }

    group.finish();
}

/// Governed assignment, including its event.
fn bench_permission_assignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("permission_assignment");
    let cache = IdentityCache::new();
    let pdp = PolicyDecisionPoint::default();

    let grantee_ctx = user_ctx(&cache, "bob");
    let request = AccessRequest::governed(
        actor(&cache),
        DataAccessContext::new(grantee_ctx.clone()),
        StateTransition::AssignPermission(PermissionGrant {
            grantee: cache.user("bob").unwrap(),
            grantee_context: grantee_ctx,
            scope: PermissionScope::Department,
            actions: ActionSet::new().with(PermissionAction::Read),
        }),
        Utc::now(),
    );

    group.bench_function("allowed_with_event", |b| {
        b.iter(|| black_box(pdp.decide(black_box(&request))));
    });

    group.finish();
}

/// Role re-parenting cost as the inheritance chain grows.
fn bench_role_inheritance_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("role_inheritance_depth");
    let cache = IdentityCache::new();
    let pdp = PolicyDecisionPoint::default();
    let resource =
        DataAccessContext::new(IsolationContext::tenant(cache.tenant("acme").unwrap()));

    for depth in [1usize, 4, 15].iter() {
        let mut catalog = RoleCatalog::new();
        let mut parent = None;
        for i in 0..*depth {
            let id = cache.entity(&format!("role-{i}")).unwrap();
            let mut role = RoleDefinition::new(id.clone(), format!("Role {i}"), RoleType::Tenant);
            if let Some(p) = parent.take() {
                role = role.with_parent(p);
            }
            catalog.insert(role);
            parent = Some(id);
        }

        let leaf = RoleDefinition::new(cache.entity("leaf").unwrap(), "Leaf", RoleType::User);
        let request = AccessRequest::governed(
            actor(&cache),
            resource.clone(),
            StateTransition::SetRoleParent {
                role: leaf,
                parent: parent.unwrap(),
                catalog,
            },
            Utc::now(),
        );

        group.throughput(Throughput::Elements(*depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &request, |b, request| {
            b.iter(|| black_box(pdp.decide(request)));
        });
    }

    group.finish();
}

/// Construct-or-fetch on a warm cache.
fn bench_identity_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity_cache");
    let cache = IdentityCache::new();
    let _warm = cache.tenant("acme").unwrap();

    group.bench_function("create_cached", |b| {
        b.iter(|| black_box(cache.tenant(black_box("acme")).unwrap()));
    });
    group.bench_function("generate", |b| {
        b.iter(|| black_box(cache.generate::<tierguard_core::EntityId>()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_access_checks,
    bench_permission_assignment,
    bench_role_inheritance_depth,
    bench_identity_cache
);
criterion_main!(benches);
