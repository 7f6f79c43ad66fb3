use super::Command;
use crate::{CaseError, CaseResult, EngineConfiguration};
use case_store::{Change, ChangeSet, DefinitionLookup, DefinitionStore, InstanceStore, Precondition};
use case_types::{ContainerRef, EngineEvent, Instance, InstanceId, PlanItem, PlanItemId};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextState {
    Open,
    Committed,
    RolledBack,
}

/// Scoped resources and transaction boundary for one logical operation.
///
/// Reads go through the context so a command sees its own staged writes.
/// Nothing reaches the instance store until [`commit`](Self::commit), and
/// engine events are only dispatched after the commit succeeded. A context
/// dropped while still open rolls back.
pub struct CommandContext<'a> {
    id: Uuid,
    command: &'static str,
    configuration: &'a EngineConfiguration,
    definitions: Arc<dyn DefinitionLookup>,
    instances: HashMap<InstanceId, Instance>,
    plan_items: HashMap<PlanItemId, PlanItem>,
    preconditions: Vec<Precondition>,
    changes: Vec<Change>,
    events: Vec<EngineEvent>,
    state: ContextState,
}

impl<'a> CommandContext<'a> {
    /// Open a context, taking a consistent definition snapshot.
    pub fn open(configuration: &'a EngineConfiguration, command: &'static str) -> CaseResult<Self> {
        let definitions = configuration.definition_store().snapshot()?;
        let id = Uuid::new_v4();
        tracing::debug!(context_id = %id, command, "Command context opened");

        Ok(Self {
            id,
            command,
            configuration,
            definitions,
            instances: HashMap::new(),
            plan_items: HashMap::new(),
            preconditions: Vec::new(),
            changes: Vec::new(),
            events: Vec::new(),
            state: ContextState::Open,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The engine configuration this context borrows from.
    ///
    /// The returned reference outlives the borrow of `self`, so hooks can be
    /// invoked with the context itself as argument.
    pub fn configuration(&self) -> &'a EngineConfiguration {
        self.configuration
    }

    /// Definition catalogue as of when the context opened.
    pub fn definitions(&self) -> &dyn DefinitionLookup {
        self.definitions.as_ref()
    }

    /// Run a command inside this context.
    ///
    /// No new context is opened and no interceptors run; the nested
    /// command's writes commit or roll back with the outer command.
    pub fn execute<C: Command>(&mut self, command: C) -> CaseResult<C::Output> {
        tracing::debug!(context_id = %self.id, outer = self.command, "Executing nested command");
        command.execute(self)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn instance(&self, id: &InstanceId) -> CaseResult<Option<Instance>> {
        if let Some(instance) = self.instances.get(id) {
            return Ok(Some(instance.clone()));
        }
        Ok(self.configuration.instance_store().get_instance(id)?)
    }

    pub fn plan_item(&self, id: &PlanItemId) -> CaseResult<Option<PlanItem>> {
        if let Some(item) = self.plan_items.get(id) {
            return Ok(Some(item.clone()));
        }
        Ok(self.configuration.instance_store().get_plan_item(id)?)
    }

    /// Direct children of a container, including staged ones.
    pub fn children(&self, container: &ContainerRef) -> CaseResult<Vec<PlanItem>> {
        let mut children = self.configuration.instance_store().children(container)?;
        for child in children.iter_mut() {
            if let Some(staged) = self.plan_items.get(&child.id) {
                *child = staged.clone();
            }
        }
        for staged in self.plan_items.values() {
            if &staged.parent() == container && !children.iter().any(|c| c.id == staged.id) {
                children.push(staged.clone());
            }
        }
        children.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(children)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Stage a new instance. Transient variables are never staged.
    pub fn insert_instance(&mut self, mut instance: Instance) {
        instance.transient_variables.clear();
        self.instances.insert(instance.id.clone(), instance.clone());
        self.changes.push(Change::InsertInstance(instance));
    }

    pub fn update_instance(&mut self, mut instance: Instance) {
        instance.transient_variables.clear();
        self.instances.insert(instance.id.clone(), instance.clone());

        let staged = self
            .changes
            .iter_mut()
            .find(|change| change.instance_id() == Some(&instance.id));
        match staged {
            Some(Change::InsertInstance(existing)) | Some(Change::UpdateInstance(existing)) => {
                *existing = instance;
            }
            _ => self.changes.push(Change::UpdateInstance(instance)),
        }
    }

    pub fn insert_plan_item(&mut self, item: PlanItem) {
        self.plan_items.insert(item.id.clone(), item.clone());
        self.changes.push(Change::InsertPlanItem(item));
    }

    pub fn update_plan_item(&mut self, item: PlanItem) {
        self.plan_items.insert(item.id.clone(), item.clone());

        let staged = self
            .changes
            .iter_mut()
            .find(|change| change.plan_item_id() == Some(&item.id));
        match staged {
            Some(Change::InsertPlanItem(existing)) | Some(Change::UpdatePlanItem(existing)) => {
                *existing = item;
            }
            _ => self.changes.push(Change::UpdatePlanItem(item)),
        }
    }

    /// Require a condition to still hold when the changes are applied.
    pub fn require(&mut self, precondition: Precondition) {
        if !self.preconditions.contains(&precondition) {
            self.preconditions.push(precondition);
        }
    }

    /// Buffer an event until commit.
    pub fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }

    // ── Boundary ─────────────────────────────────────────────────────

    /// Apply every staged change atomically, then dispatch buffered events.
    pub fn commit(mut self) -> CaseResult<()> {
        let mut set = ChangeSet::new();
        for precondition in std::mem::take(&mut self.preconditions) {
            set.require(precondition);
        }
        for change in std::mem::take(&mut self.changes) {
            set.push(change);
        }
        let change_count = set.len();

        if !set.is_empty() {
            if let Err(err) = self.configuration.instance_store().apply(set) {
                self.discard();
                self.state = ContextState::RolledBack;
                tracing::debug!(context_id = %self.id, error = %err, "Commit rejected by store");
                return Err(CaseError::from_commit(err));
            }
        }
        self.state = ContextState::Committed;

        let events = std::mem::take(&mut self.events);
        for event in &events {
            for listener in self.configuration.listeners() {
                listener.on_event(event);
            }
        }

        tracing::debug!(
            context_id = %self.id,
            command = self.command,
            changes = change_count,
            events = events.len(),
            "Command context committed"
        );
        Ok(())
    }

    /// Discard every staged change and buffered event.
    pub fn rollback(mut self) {
        self.discard();
        self.state = ContextState::RolledBack;
        tracing::debug!(context_id = %self.id, command = self.command, "Command context rolled back");
    }

    fn discard(&mut self) {
        self.instances.clear();
        self.plan_items.clear();
        self.preconditions.clear();
        self.changes.clear();
        self.events.clear();
    }
}

impl Drop for CommandContext<'_> {
    fn drop(&mut self) {
        if self.state == ContextState::Open {
            self.discard();
            tracing::debug!(context_id = %self.id, command = self.command, "Command context dropped while open; rolled back");
        }
    }
}
