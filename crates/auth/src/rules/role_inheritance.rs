use tierguard_core::DomainResult;

use crate::specification::Specification;
use crate::{Lineage, RoleCatalog, RoleDefinition};

use super::{BusinessRule, RuleVerdict};

/// Input of [`RoleInheritanceBusinessRule`]: a role carrying its proposed
/// parent, checked against the known roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInheritanceContext {
    pub role: RoleDefinition,
    pub catalog: RoleCatalog,
}

impl RoleInheritanceContext {
    fn parent(&self) -> Option<&RoleDefinition> {
        self.role.parent().and_then(|id| self.catalog.get(id))
    }
}

/// Role inheritance must form a shallow forest, and a child may not imply a
/// broader scope than its parent.
#[derive(Debug, Clone)]
pub struct RoleInheritanceBusinessRule {
    spec: Specification<RoleInheritanceContext>,
}

impl RoleInheritanceBusinessRule {
    pub const NAME: &'static str = "role_inheritance";

    pub fn new(max_depth: usize) -> Self {
        let acyclic = Specification::leaf(
            "acyclic",
            "inheritance cycle detected",
            |ctx: &RoleInheritanceContext| {
                !matches!(ctx.catalog.lineage(&ctx.role), Lineage::Cycle { .. })
            },
        );

        let parent_known = Specification::leaf(
            "parent_known",
            "parent role not found",
            |ctx: &RoleInheritanceContext| {
                !matches!(ctx.catalog.lineage(&ctx.role), Lineage::MissingParent(_))
            },
        );

        let shallow = Specification::leaf(
            "depth_within_limit",
            "inheritance depth exceeds limit",
            move |ctx: &RoleInheritanceContext| match ctx.catalog.lineage(&ctx.role) {
                Lineage::Rooted { depth } => depth <= max_depth,
                _ => true,
            },
        );

        let scope = Specification::leaf(
            "scope_within_parent",
            "child scope exceeds parent scope",
            |ctx: &RoleInheritanceContext| {
                let Some(parent) = ctx.parent() else {
                    return true;
                };
                match (parent.implied_scope(), ctx.role.implied_scope()) {
                    (Ok(parent), Ok(child)) => parent.is_broader_or_equal(child),
                    _ => false,
                }
            },
        );

        Self {
            spec: acyclic.and(parent_known).and(shallow).and(scope),
        }
    }
}

impl BusinessRule for RoleInheritanceBusinessRule {
    type Context = RoleInheritanceContext;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, context: &Self::Context) -> DomainResult<RuleVerdict> {
        context.role.implied_scope()?;
        if let Some(parent) = context.parent() {
            parent.implied_scope()?;
        }
        Ok(RuleVerdict::new(Self::NAME, self.spec.is_satisfied_by(context)))
    }
}
