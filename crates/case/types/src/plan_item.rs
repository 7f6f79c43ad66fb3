//! Plan items: runtime units of work inside a case instance
//!
//! Plan items live either directly under the case instance or inside a
//! stage. A stage is itself a plan item whose kind is `Stage`.

use crate::{DefinitionId, InstanceId, PlanItemId, TenantId, Variables};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Container Reference ──────────────────────────────────────────────

/// The container a plan item is (or will be) a child of
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRef {
    /// The root case instance
    Case(InstanceId),
    /// A stage plan item within a case instance
    Stage(PlanItemId),
}

impl std::fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerRef::Case(id) => write!(f, "case instance '{}'", id),
            ContainerRef::Stage(id) => write!(f, "stage '{}'", id),
        }
    }
}

// ── Plan Item Definition ─────────────────────────────────────────────

/// Type of runtime unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanItemKind {
    HumanTask,
    ServiceTask,
    ProcessTask,
    CaseTask,
    Milestone,
    EventListener,
    /// Container for nested plan items
    Stage,
}

impl std::fmt::Display for PlanItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlanItemKind::HumanTask => "human_task",
            PlanItemKind::ServiceTask => "service_task",
            PlanItemKind::ProcessTask => "process_task",
            PlanItemKind::CaseTask => "case_task",
            PlanItemKind::Milestone => "milestone",
            PlanItemKind::EventListener => "event_listener",
            PlanItemKind::Stage => "stage",
        };
        f.write_str(name)
    }
}

/// Definition fragment describing what a plan item is and does
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItemDefinition {
    pub kind: PlanItemKind,
    /// Model element the plan item was created from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    /// Definition the element belongs to, when it comes from a model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_id: Option<DefinitionId>,
}

impl PlanItemDefinition {
    pub fn new(kind: PlanItemKind) -> Self {
        Self {
            kind,
            element_id: None,
            definition_id: None,
        }
    }

    pub fn with_element_id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }

    pub fn with_definition_id(mut self, definition_id: impl Into<DefinitionId>) -> Self {
        self.definition_id = Some(definition_id.into());
        self
    }
}

// ── Plan Item ────────────────────────────────────────────────────────

/// Lifecycle state of a plan item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanItemState {
    #[default]
    Available,
    Enabled,
    Active,
    Completed,
    Terminated,
}

impl PlanItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanItemState::Completed | PlanItemState::Terminated)
    }
}

/// A persisted runtime unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanItem {
    pub id: PlanItemId,
    /// Owning case instance
    pub case_instance_id: InstanceId,
    /// Parent stage, `None` for top-level plan items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<PlanItemId>,
    pub definition: PlanItemDefinition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub state: PlanItemState,
    #[serde(default = "crate::instance::first_revision")]
    pub revision: u64,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub tenant_id: TenantId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanItem {
    pub fn new(
        id: PlanItemId,
        case_instance_id: InstanceId,
        stage_id: Option<PlanItemId>,
        definition: PlanItemDefinition,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            case_instance_id,
            stage_id,
            definition,
            name: None,
            state: PlanItemState::Available,
            revision: crate::instance::first_revision(),
            variables: Variables::new(),
            tenant_id: TenantId::NoTenant,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> PlanItemKind {
        self.definition.kind
    }

    pub fn is_stage(&self) -> bool {
        self.definition.kind == PlanItemKind::Stage
    }

    /// The container this plan item is a child of
    pub fn parent(&self) -> ContainerRef {
        match &self.stage_id {
            Some(stage_id) => ContainerRef::Stage(stage_id.clone()),
            None => ContainerRef::Case(self.case_instance_id.clone()),
        }
    }

    /// A stage can accept children while it is not terminal.
    ///
    /// Whether its owning case is active must be checked separately.
    pub fn is_open_stage(&self) -> bool {
        self.is_stage() && !self.state.is_terminal()
    }

    pub fn transition(&mut self, state: PlanItemState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}
