use tierguard_core::TenantId;

/// Helper trait for tenant-scoped messages.
///
/// Lets the publishing side route or partition messages per tenant without
/// knowing their concrete type. Platform-level messages have no tenant.
pub trait TenantScoped {
    fn tenant_id(&self) -> Option<&TenantId>;

    fn belongs_to(&self, tenant_id: &TenantId) -> bool {
        self.tenant_id() == Some(tenant_id)
    }
}
