//! Definitions: versioned, immutable templates for processes and cases
//!
//! A definition is addressed either by its id or by its key. Keys are not
//! unique: every deployment of the same key within a tenant produces a new,
//! strictly higher version. Versions are never reused.

use crate::{DefinitionId, TenantId, Variables};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Definition ───────────────────────────────────────────────────────

/// What kind of model a definition describes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    #[default]
    Process,
    Case,
}

/// A data object declared by a definition, with its default value.
///
/// Data objects seed the variables of every instance created from the
/// definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValuedDataObject {
    pub name: String,
    pub value: serde_json::Value,
}

impl ValuedDataObject {
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A persisted, versioned definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    /// Unique identifier
    pub id: DefinitionId,
    /// Human key, shared across versions and tenants
    pub key: String,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Version within (key, tenant)
    pub version: u32,
    /// Owning tenant
    #[serde(default)]
    pub tenant_id: TenantId,
    pub kind: DefinitionKind,
    /// Valued data objects that become initial variables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_objects: Vec<ValuedDataObject>,
    /// When this version was deployed
    pub deployed_at: DateTime<Utc>,
}

impl Definition {
    /// Create a definition with an explicit version and a generated id
    pub fn new(key: impl Into<String>, version: u32) -> Self {
        Self {
            id: DefinitionId::generate(),
            key: key.into(),
            name: None,
            version,
            tenant_id: TenantId::NoTenant,
            kind: DefinitionKind::Process,
            data_objects: Vec::new(),
            deployed_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<DefinitionId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<TenantId>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: DefinitionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_data_object(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.data_objects.push(ValuedDataObject::new(name, value));
        self
    }

    /// Variables seeded from the definition's data objects.
    ///
    /// A later data object with the same name wins.
    pub fn initial_variables(&self) -> Variables {
        self.data_objects
            .iter()
            .map(|d| (d.name.clone(), d.value.clone()))
            .collect()
    }
}

// ── Deployment Draft ─────────────────────────────────────────────────

/// A definition awaiting deployment.
///
/// The deploying store assigns the id and the next version for
/// (key, tenant).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionDraft {
    pub key: String,
    pub name: Option<String>,
    pub tenant_id: TenantId,
    pub kind: DefinitionKind,
    pub data_objects: Vec<ValuedDataObject>,
}

impl DefinitionDraft {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<TenantId>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: DefinitionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_data_object(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.data_objects.push(ValuedDataObject::new(name, value));
        self
    }

    /// Materialize the draft at the given version
    pub fn into_definition(self, id: DefinitionId, version: u32) -> Definition {
        Definition {
            id,
            key: self.key,
            name: self.name,
            version,
            tenant_id: self.tenant_id,
            kind: self.kind,
            data_objects: self.data_objects,
            deployed_at: Utc::now(),
        }
    }
}
