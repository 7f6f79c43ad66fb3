//! Test doubles for engine collaborators.

use crate::{CaseError, CaseResult, CommandContext, EventListener, ExecutionInterpreter};
use case_store::{ChangeSet, InMemoryInstanceStore, InstanceStore, StoreError, StoreResult};
use case_types::{
    ContainerRef, Definition, EngineEvent, Instance, InstanceId, PlanItem, PlanItemId,
    PlanItemState, Variables,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Records every dispatched event.
#[derive(Debug, Default)]
pub struct RecordingEventListener {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingEventListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(EngineEvent::name).collect()
    }
}

impl EventListener for RecordingEventListener {
    fn on_event(&self, event: &EngineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Activates like the default interpreter and records what it saw.
#[derive(Debug, Default)]
pub struct RecordingInterpreter {
    transient_seen: Mutex<Vec<(InstanceId, Variables)>>,
    plan_items_seen: Mutex<Vec<PlanItemId>>,
}

impl RecordingInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transient variables present on each instance at activation.
    pub fn transient_seen(&self) -> Vec<(InstanceId, Variables)> {
        self.transient_seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    pub fn plan_items_seen(&self) -> Vec<PlanItemId> {
        self.plan_items_seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl ExecutionInterpreter for RecordingInterpreter {
    fn activate_instance(
        &self,
        _ctx: &mut CommandContext<'_>,
        instance: &mut Instance,
        _definition: &Definition,
    ) -> CaseResult<()> {
        if let Ok(mut seen) = self.transient_seen.lock() {
            seen.push((instance.id.clone(), instance.transient_variables.clone()));
        }
        instance.activate();
        Ok(())
    }

    fn activate_plan_item(
        &self,
        _ctx: &mut CommandContext<'_>,
        plan_item: &mut PlanItem,
    ) -> CaseResult<()> {
        if let Ok(mut seen) = self.plan_items_seen.lock() {
            seen.push(plan_item.id.clone());
        }
        plan_item.transition(PlanItemState::Active);
        Ok(())
    }
}

/// Refuses every activation.
#[derive(Debug, Clone)]
pub struct FailingInterpreter {
    message: String,
}

impl FailingInterpreter {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ExecutionInterpreter for FailingInterpreter {
    fn activate_instance(
        &self,
        _ctx: &mut CommandContext<'_>,
        _instance: &mut Instance,
        _definition: &Definition,
    ) -> CaseResult<()> {
        Err(CaseError::Activation(self.message.clone()))
    }

    fn activate_plan_item(
        &self,
        _ctx: &mut CommandContext<'_>,
        _plan_item: &mut PlanItem,
    ) -> CaseResult<()> {
        Err(CaseError::Activation(self.message.clone()))
    }
}

/// Instance store whose first `failures` change sets fail transiently.
pub struct FlakyInstanceStore {
    inner: Arc<InMemoryInstanceStore>,
    failures_remaining: AtomicU32,
    apply_calls: AtomicU32,
}

impl FlakyInstanceStore {
    pub fn new(inner: Arc<InMemoryInstanceStore>, failures: u32) -> Self {
        Self {
            inner,
            failures_remaining: AtomicU32::new(failures),
            apply_calls: AtomicU32::new(0),
        }
    }

    /// How many change sets were submitted, failed ones included.
    pub fn apply_calls(&self) -> u32 {
        self.apply_calls.load(Ordering::SeqCst)
    }
}

impl InstanceStore for FlakyInstanceStore {
    fn next_instance_id(&self) -> StoreResult<InstanceId> {
        self.inner.next_instance_id()
    }

    fn next_plan_item_id(&self) -> StoreResult<PlanItemId> {
        self.inner.next_plan_item_id()
    }

    fn get_instance(&self, id: &InstanceId) -> StoreResult<Option<Instance>> {
        self.inner.get_instance(id)
    }

    fn get_plan_item(&self, id: &PlanItemId) -> StoreResult<Option<PlanItem>> {
        self.inner.get_plan_item(id)
    }

    fn children(&self, container: &ContainerRef) -> StoreResult<Vec<PlanItem>> {
        self.inner.children(container)
    }

    fn apply(&self, changes: ChangeSet) -> StoreResult<()> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(StoreError::Transient("simulated serialization failure".to_string()));
        }
        self.inner.apply(changes)
    }
}
