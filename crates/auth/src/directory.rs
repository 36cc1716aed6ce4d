use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tierguard_core::{DataAccessContext, EntityId, UserId};

use crate::{Actor, RoleCatalog, RoleDefinition};

/// Context lookups supplied by the persistence layer.
///
/// The policy engine never queries storage itself; callers resolve actors,
/// resources and roles through this seam.
pub trait ContextDirectory: Send + Sync {
    fn actor(&self, id: &UserId) -> Option<Actor>;
    fn resource(&self, id: &EntityId) -> Option<DataAccessContext>;
    fn role(&self, id: &EntityId) -> Option<RoleDefinition>;
    /// Snapshot of every known role, for inheritance checks.
    fn roles(&self) -> RoleCatalog;
}

impl<D> ContextDirectory for Arc<D>
where
    D: ContextDirectory + ?Sized,
{
    fn actor(&self, id: &UserId) -> Option<Actor> {
        (**self).actor(id)
    }

    fn resource(&self, id: &EntityId) -> Option<DataAccessContext> {
        (**self).resource(id)
    }

    fn role(&self, id: &EntityId) -> Option<RoleDefinition> {
        (**self).role(id)
    }

    fn roles(&self) -> RoleCatalog {
        (**self).roles()
    }
}

#[derive(Debug, Default)]
struct Records {
    actors: HashMap<UserId, Actor>,
    resources: HashMap<EntityId, DataAccessContext>,
    roles: RoleCatalog,
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<Records>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_actor(&self, actor: Actor) {
        if let Ok(mut records) = self.inner.write() {
            records.actors.insert(actor.identity.clone(), actor);
        }
    }

    pub fn upsert_resource(&self, id: EntityId, resource: DataAccessContext) {
        if let Ok(mut records) = self.inner.write() {
            records.resources.insert(id, resource);
        }
    }

    pub fn upsert_role(&self, role: RoleDefinition) {
        if let Ok(mut records) = self.inner.write() {
            records.roles.insert(role);
        }
    }
}

impl ContextDirectory for InMemoryDirectory {
    fn actor(&self, id: &UserId) -> Option<Actor> {
        let records = self.inner.read().ok()?;
        records.actors.get(id).cloned()
    }

    fn resource(&self, id: &EntityId) -> Option<DataAccessContext> {
        let records = self.inner.read().ok()?;
        records.resources.get(id).cloned()
    }

    fn role(&self, id: &EntityId) -> Option<RoleDefinition> {
        let records = self.inner.read().ok()?;
        records.roles.get(id).cloned()
    }

    fn roles(&self) -> RoleCatalog {
        match self.inner.read() {
            Ok(records) => records.roles.clone(),
            Err(_) => RoleCatalog::new(),
        }
    }
}
