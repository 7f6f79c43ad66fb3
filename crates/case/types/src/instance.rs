//! Instances: running executions of a definition
//!
//! An instance keeps an immutable reference to the definition version it
//! was created from, which may differ from what the caller asked for when
//! tenant fallback was applied.

use crate::{Definition, DefinitionId, InstanceId, TenantId, Variables};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an instance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    /// Constructed but not yet activated
    #[default]
    Created,
    Active,
    Completed,
    Terminated,
}

impl InstanceState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceState::Completed | InstanceState::Terminated)
    }
}

/// A running instance of a definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    /// The definition actually used (post fallback)
    pub definition_id: DefinitionId,
    pub definition_key: String,
    pub definition_version: u32,
    /// Opaque correlation string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_key: Option<String>,
    /// Display name override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub tenant_id: TenantId,
    pub state: InstanceState,
    /// Bumped by the store on every committed change to this record or
    /// its direct children. An update carrying an older revision is stale.
    #[serde(default = "first_revision")]
    pub revision: u64,
    /// Durable variables
    #[serde(default)]
    pub variables: Variables,
    /// Variables visible only while the creating command runs. Never
    /// persisted, never serialized.
    #[serde(skip)]
    pub transient_variables: Variables,
    /// Correlation to an external initiator (e.g. a parent process)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Instance {
    /// Create an instance referencing `definition`, owned by `tenant_id`
    pub fn new(id: InstanceId, definition: &Definition, tenant_id: TenantId) -> Self {
        let now = Utc::now();
        Self {
            id,
            definition_id: definition.id.clone(),
            definition_key: definition.key.clone(),
            definition_version: definition.version,
            business_key: None,
            name: None,
            tenant_id,
            state: InstanceState::Created,
            revision: first_revision(),
            variables: Variables::new(),
            transient_variables: Variables::new(),
            callback_id: None,
            callback_type: None,
            created_at: now,
            updated_at: now,
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == InstanceState::Active
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Transition from Created to Active
    pub fn activate(&mut self) {
        self.state = InstanceState::Active;
        self.updated_at = Utc::now();
    }

    pub fn terminate(&mut self) {
        let now = Utc::now();
        self.state = InstanceState::Terminated;
        self.updated_at = now;
        self.ended_at = Some(now);
    }

    /// Look up a variable, transient variables shadowing persistent ones
    pub fn variable(&self, name: &str) -> Option<&serde_json::Value> {
        self.transient_variables
            .get(name)
            .or_else(|| self.variables.get(name))
    }
}

pub(crate) fn first_revision() -> u64 {
    1
}
