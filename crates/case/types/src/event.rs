use crate::{ContainerRef, DefinitionId, InstanceId, PlanItemId, PlanItemKind, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notifications emitted by engine operations.
///
/// Events are only dispatched once the operation that produced them has
/// committed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    InstanceCreated {
        instance_id: InstanceId,
        definition_id: DefinitionId,
        tenant_id: TenantId,
        at: DateTime<Utc>,
    },
    InstanceStarted {
        instance_id: InstanceId,
        at: DateTime<Utc>,
    },
    PlanItemInjected {
        plan_item_id: PlanItemId,
        container: ContainerRef,
        kind: PlanItemKind,
        at: DateTime<Utc>,
    },
    PlanItemActivated {
        plan_item_id: PlanItemId,
        at: DateTime<Utc>,
    },
    ContainerTerminated {
        container: ContainerRef,
        at: DateTime<Utc>,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::InstanceCreated { .. } => "instance_created",
            EngineEvent::InstanceStarted { .. } => "instance_started",
            EngineEvent::PlanItemInjected { .. } => "plan_item_injected",
            EngineEvent::PlanItemActivated { .. } => "plan_item_activated",
            EngineEvent::ContainerTerminated { .. } => "container_terminated",
        }
    }
}
