use serde::{Deserialize, Serialize};

/// Tenant partition of definitions and instances.
///
/// `NoTenant` is the sentinel for "no tenant". It is distinct
/// from `Tenant(String::new())`: an empty tenant string is a real
/// tenant and never matches the no-tenant catalogue.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantId {
    #[default]
    NoTenant,
    Tenant(String),
}

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        TenantId::Tenant(id.into())
    }

    pub fn is_no_tenant(&self) -> bool {
        matches!(self, TenantId::NoTenant)
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenantId::NoTenant => write!(f, "<no tenant>"),
            TenantId::Tenant(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        TenantId::new(id)
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        TenantId::Tenant(id)
    }
}
