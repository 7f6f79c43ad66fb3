//! Atomic units of persistence work.

use case_types::{ContainerRef, Instance, InstanceId, PlanItem, PlanItemId};
use serde::{Deserialize, Serialize};

/// A condition the store re-checks when applying a change set.
///
/// Conditions are evaluated against the state the store would hold after
/// the change set is applied, so a set that creates and then uses a
/// container in one go passes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precondition {
    /// The container exists and is active. A stage is active when it is not
    /// terminal and its case instance is active.
    ContainerActive(ContainerRef),
}

impl std::fmt::Display for Precondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precondition::ContainerActive(container) => write!(f, "{} is active", container),
        }
    }
}

/// A single record mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    InsertInstance(Instance),
    UpdateInstance(Instance),
    InsertPlanItem(PlanItem),
    UpdatePlanItem(PlanItem),
}

impl Change {
    pub fn instance_id(&self) -> Option<&InstanceId> {
        match self {
            Change::InsertInstance(i) | Change::UpdateInstance(i) => Some(&i.id),
            _ => None,
        }
    }

    pub fn plan_item_id(&self) -> Option<&PlanItemId> {
        match self {
            Change::InsertPlanItem(p) | Change::UpdatePlanItem(p) => Some(&p.id),
            _ => None,
        }
    }
}

/// Changes applied all-or-nothing, guarded by preconditions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    preconditions: Vec<Precondition>,
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(&mut self, precondition: Precondition) {
        if !self.preconditions.contains(&precondition) {
            self.preconditions.push(precondition);
        }
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn preconditions(&self) -> &[Precondition] {
        &self.preconditions
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn into_parts(self) -> (Vec<Precondition>, Vec<Change>) {
        (self.preconditions, self.changes)
    }
}
