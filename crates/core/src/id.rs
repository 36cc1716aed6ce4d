//! Canonical, deduplicated identifiers for the isolation hierarchy.
//!
//! Identifiers are only obtainable through an [`IdentityCache`], which hands
//! out one shared instance per canonical value. Equal identifiers therefore
//! share storage, and equality checks can short-circuit on pointer identity.
//! The cache is an ordinary value owned by the calling service; there is no
//! process-wide registry.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Maximum length of a canonical identifier.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Which family an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    Tenant,
    Organization,
    Department,
    User,
    Entity,
}

impl IdentityKind {
    pub const ALL: [IdentityKind; 5] = [
        IdentityKind::Tenant,
        IdentityKind::Organization,
        IdentityKind::Department,
        IdentityKind::User,
        IdentityKind::Entity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IdentityKind::Tenant => "tenant",
            IdentityKind::Organization => "organization",
            IdentityKind::Department => "department",
            IdentityKind::User => "user",
            IdentityKind::Entity => "entity",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl core::fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

mod sealed {
    use std::sync::Arc;

    pub trait Sealed {
        fn from_canonical(value: Arc<str>) -> Self;
        fn shared(&self) -> &Arc<str>;
    }
}

/// Common interface of all identifier types.
///
/// Sealed: instances can only be produced by [`IdentityCache`].
pub trait Identity:
    sealed::Sealed
    + Clone
    + Eq
    + Hash
    + Ord
    + core::fmt::Debug
    + core::fmt::Display
    + Send
    + Sync
    + 'static
{
    const KIND: IdentityKind;

    /// Canonical string form.
    fn as_str(&self) -> &str {
        self.shared()
    }

    /// True when both handles point at the same cached instance.
    fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(self.shared(), other.shared())
    }
}

macro_rules! identity_type {
    ($(#[$meta:meta])* $t:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $t(Arc<str>);

        impl sealed::Sealed for $t {
            fn from_canonical(value: Arc<str>) -> Self {
                Self(value)
            }

            fn shared(&self) -> &Arc<str> {
                &self.0
            }
        }

        impl Identity for $t {
            const KIND: IdentityKind = $kind;
        }

        impl $t {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
            }
        }

        impl Eq for $t {}

        impl Hash for $t {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        impl PartialOrd for $t {
            fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $t {
            fn cmp(&self, other: &Self) -> core::cmp::Ordering {
                self.0.cmp(&other.0)
            }
        }

        impl core::fmt::Debug for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_tuple(stringify!($t)).field(&&*self.0).finish()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Serialize for $t {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl ValueObject for $t {}
    };
}

identity_type!(
    /// Identifier of a tenant (top-level isolation boundary below the platform).
    TenantId,
    IdentityKind::Tenant
);
identity_type!(
    /// Identifier of an organization within a tenant.
    OrganizationId,
    IdentityKind::Organization
);
identity_type!(
    /// Identifier of a department within an organization.
    DepartmentId,
    IdentityKind::Department
);
identity_type!(
    /// Identifier of a user (actor identity).
    UserId,
    IdentityKind::User
);
identity_type!(
    /// Identifier of any other entity (roles, credentials, resources).
    EntityId,
    IdentityKind::Entity
);

/// Any identifier, tagged with its family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum IdentityRef {
    Tenant(TenantId),
    Organization(OrganizationId),
    Department(DepartmentId),
    User(UserId),
    Entity(EntityId),
}

impl IdentityRef {
    pub fn kind(&self) -> IdentityKind {
        match self {
            IdentityRef::Tenant(_) => IdentityKind::Tenant,
            IdentityRef::Organization(_) => IdentityKind::Organization,
            IdentityRef::Department(_) => IdentityKind::Department,
            IdentityRef::User(_) => IdentityKind::User,
            IdentityRef::Entity(_) => IdentityKind::Entity,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            IdentityRef::Tenant(id) => id.as_str(),
            IdentityRef::Organization(id) => id.as_str(),
            IdentityRef::Department(id) => id.as_str(),
            IdentityRef::User(id) => id.as_str(),
            IdentityRef::Entity(id) => id.as_str(),
        }
    }
}

impl core::fmt::Display for IdentityRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.as_str())
    }
}

macro_rules! impl_identity_ref_from {
    ($t:ty, $variant:ident) => {
        impl From<$t> for IdentityRef {
            fn from(value: $t) -> Self {
                IdentityRef::$variant(value)
            }
        }
    };
}

impl_identity_ref_from!(TenantId, Tenant);
impl_identity_ref_from!(OrganizationId, Organization);
impl_identity_ref_from!(DepartmentId, Department);
impl_identity_ref_from!(UserId, User);
impl_identity_ref_from!(EntityId, Entity);

/// Normalize a raw identifier into its canonical form.
///
/// Surrounding whitespace is ignored and UUIDs are rendered lowercase and
/// hyphenated; anything else must stay within `[A-Za-z0-9_.:-]`.
pub fn canonicalize(kind: IdentityKind, raw: &str) -> DomainResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_identifier(kind, raw, "empty value"));
    }
    if trimmed.len() > MAX_IDENTIFIER_LEN {
        return Err(DomainError::invalid_identifier(
            kind,
            raw,
            format!("longer than {MAX_IDENTIFIER_LEN} characters"),
        ));
    }
    if let Ok(uuid) = Uuid::try_parse(trimmed) {
        return Ok(uuid.hyphenated().to_string());
    }
    if let Some(bad) = trimmed
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-')))
    {
        return Err(DomainError::invalid_identifier(
            kind,
            raw,
            format!("disallowed character {bad:?}"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Raw pool size below which dead entries are left in place.
const MIN_SWEEP_THRESHOLD: usize = 64;

/// Per-kind map from canonical value to its live instance.
#[derive(Debug, Default)]
struct Pool {
    entries: DashMap<Box<str>, Weak<str>>,
    /// Raw size that triggers the next sweep; zero until the first one.
    sweep_at: AtomicUsize,
}

impl Pool {
    fn live(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.value().strong_count() > 0)
            .count()
    }

    /// Drop dead entries and rearm the threshold at twice the live count.
    fn sweep(&self) {
        self.entries.retain(|_, weak| weak.strong_count() > 0);
        let next = (self.entries.len() * 2).max(MIN_SWEEP_THRESHOLD);
        self.sweep_at.store(next, Ordering::Relaxed);
    }

    fn sweep_if_needed(&self) {
        let threshold = self.sweep_at.load(Ordering::Relaxed).max(MIN_SWEEP_THRESHOLD);
        if self.entries.len() > threshold {
            self.sweep();
        }
    }
}

/// Construct-or-fetch cache of identifier instances.
///
/// One pool per [`IdentityKind`]; pools hold weak references so instances
/// are freed once the last handle is dropped. Construct-or-fetch for a key
/// runs under that key's shard lock, so concurrent first calls with the same
/// value agree on a single instance.
///
/// Entries of released instances are swept whenever a pool grows past twice
/// its live count, so bookkeeping stays proportional to live identifiers.
#[derive(Debug, Default)]
pub struct IdentityCache {
    pools: [Pool; 5],
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached instance for `raw`, constructing it on first use.
    pub fn create<I: Identity>(&self, raw: &str) -> DomainResult<I> {
        let canonical = canonicalize(I::KIND, raw)?;
        Ok(I::from_canonical(self.intern(I::KIND, canonical)))
    }

    /// Create and cache an identifier with a fresh UUIDv7 value.
    pub fn generate<I: Identity>(&self) -> I {
        let canonical = Uuid::now_v7().hyphenated().to_string();
        I::from_canonical(self.intern(I::KIND, canonical))
    }

    pub fn tenant(&self, raw: &str) -> DomainResult<TenantId> {
        self.create(raw)
    }

    pub fn organization(&self, raw: &str) -> DomainResult<OrganizationId> {
        self.create(raw)
    }

    pub fn department(&self, raw: &str) -> DomainResult<DepartmentId> {
        self.create(raw)
    }

    pub fn user(&self, raw: &str) -> DomainResult<UserId> {
        self.create(raw)
    }

    pub fn entity(&self, raw: &str) -> DomainResult<EntityId> {
        self.create(raw)
    }

    /// Number of live cached instances across all kinds.
    pub fn len(&self) -> usize {
        self.pools.iter().map(Pool::live).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop bookkeeping for every instance that is no longer referenced.
    pub fn prune(&self) {
        for pool in &self.pools {
            pool.sweep();
        }
    }

    /// Forget every cached instance.
    ///
    /// Handles already given out stay valid but are no longer shared with
    /// instances created afterwards.
    #[cfg(any(test, feature = "test-support"))]
    pub fn clear(&self) {
        for pool in &self.pools {
            pool.entries.clear();
            pool.sweep_at.store(0, Ordering::Relaxed);
        }
    }

    #[cfg(test)]
    fn raw_len(&self) -> usize {
        self.pools.iter().map(|pool| pool.entries.len()).sum()
    }

    fn intern(&self, kind: IdentityKind, canonical: String) -> Arc<str> {
        let pool = &self.pools[kind.index()];

        let hit = pool.entries.get(canonical.as_str()).and_then(|w| w.upgrade());
        if let Some(shared) = hit {
            return shared;
        }

        let shared = match pool.entries.entry(canonical.into_boxed_str()) {
            Entry::Occupied(mut entry) => match entry.get().upgrade() {
                Some(shared) => return shared,
                None => {
                    let shared: Arc<str> = Arc::from(&**entry.key());
                    entry.insert(Arc::downgrade(&shared));
                    return shared;
                }
            },
            Entry::Vacant(entry) => {
                let shared: Arc<str> = Arc::from(&**entry.key());
                tracing::debug!(kind = %kind, id = %shared, "identity cached");
                entry.insert(Arc::downgrade(&shared));
                shared
            }
        };

        // The shard guard is released here; sweeping takes every shard lock.
        pool.sweep_if_needed();
        shared
    }
}
