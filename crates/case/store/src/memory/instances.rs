use crate::{Change, ChangeSet, InstanceStore, Precondition, StoreError, StoreResult};
use case_types::{ContainerRef, Instance, InstanceId, PlanItem, PlanItemId};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Everything the in-memory instance store holds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstanceTables {
    pub instances: BTreeMap<InstanceId, Instance>,
    pub plan_items: BTreeMap<PlanItemId, PlanItem>,
}

/// In-memory instance store.
#[derive(Default)]
pub struct InMemoryInstanceStore {
    tables: RwLock<InstanceTables>,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current contents.
    pub fn tables(&self) -> StoreResult<InstanceTables> {
        let guard = self
            .tables
            .read()
            .map_err(|_| StoreError::Backend("instance tables lock poisoned".to_string()))?;
        Ok(guard.clone())
    }
}

/// Records touched by a change set, layered over the committed tables.
struct Overlay<'a> {
    tables: &'a InstanceTables,
    instances: HashMap<InstanceId, Instance>,
    plan_items: HashMap<PlanItemId, PlanItem>,
}

impl<'a> Overlay<'a> {
    fn new(tables: &'a InstanceTables) -> Self {
        Self {
            tables,
            instances: HashMap::new(),
            plan_items: HashMap::new(),
        }
    }

    fn instance(&self, id: &InstanceId) -> Option<&Instance> {
        self.instances
            .get(id)
            .or_else(|| self.tables.instances.get(id))
    }

    fn plan_item(&self, id: &PlanItemId) -> Option<&PlanItem> {
        self.plan_items
            .get(id)
            .or_else(|| self.tables.plan_items.get(id))
    }

    fn stage(&mut self, change: Change) -> StoreResult<()> {
        match change {
            Change::InsertInstance(instance) => {
                if self.instance(&instance.id).is_some() {
                    return Err(StoreError::Conflict(format!(
                        "instance {} already exists",
                        instance.id
                    )));
                }
                self.instances.insert(instance.id.clone(), instance);
            }
            Change::UpdateInstance(instance) => {
                if self.instance(&instance.id).is_none() {
                    return Err(StoreError::NotFound(format!(
                        "instance {} not found",
                        instance.id
                    )));
                }
                if let Some(current) = self.tables.instances.get(&instance.id) {
                    check_revision(
                        "instance",
                        instance.id.as_str(),
                        current.revision,
                        instance.revision,
                    )?;
                }
                self.instances.insert(instance.id.clone(), instance);
            }
            Change::InsertPlanItem(item) => {
                if self.plan_item(&item.id).is_some() {
                    return Err(StoreError::Conflict(format!(
                        "plan item {} already exists",
                        item.id
                    )));
                }
                self.touch_parent(&item)?;
                self.plan_items.insert(item.id.clone(), item);
            }
            Change::UpdatePlanItem(item) => {
                if self.plan_item(&item.id).is_none() {
                    return Err(StoreError::NotFound(format!(
                        "plan item {} not found",
                        item.id
                    )));
                }
                if let Some(current) = self.tables.plan_items.get(&item.id) {
                    check_revision(
                        "plan item",
                        item.id.as_str(),
                        current.revision,
                        item.revision,
                    )?;
                }
                self.plan_items.insert(item.id.clone(), item);
            }
        }
        Ok(())
    }

    /// Check the new item's parents exist and mark its direct container as
    /// changed, so a concurrent update of that container becomes stale.
    fn touch_parent(&mut self, item: &PlanItem) -> StoreResult<()> {
        let case = self.instance(&item.case_instance_id).cloned().ok_or_else(|| {
            StoreError::NotFound(format!("instance {} not found", item.case_instance_id))
        })?;
        match &item.stage_id {
            Some(stage_id) => {
                let stage = self.plan_item(stage_id).cloned().ok_or_else(|| {
                    StoreError::NotFound(format!("plan item {} not found", stage_id))
                })?;
                self.plan_items.entry(stage_id.clone()).or_insert(stage);
            }
            None => {
                self.instances.entry(case.id.clone()).or_insert(case);
            }
        }
        Ok(())
    }

    fn holds(&self, precondition: &Precondition) -> bool {
        match precondition {
            Precondition::ContainerActive(ContainerRef::Case(id)) => {
                self.instance(id).is_some_and(Instance::is_active)
            }
            Precondition::ContainerActive(ContainerRef::Stage(id)) => {
                self.plan_item(id).is_some_and(|stage| {
                    stage.is_open_stage()
                        && self
                            .instance(&stage.case_instance_id)
                            .is_some_and(Instance::is_active)
                })
            }
        }
    }

    /// Staged records with their revisions advanced past the committed ones.
    fn into_records(self) -> (HashMap<InstanceId, Instance>, HashMap<PlanItemId, PlanItem>) {
        let Overlay {
            tables,
            mut instances,
            mut plan_items,
        } = self;
        for (id, instance) in instances.iter_mut() {
            if let Some(current) = tables.instances.get(id) {
                instance.revision = current.revision + 1;
            }
        }
        for (id, item) in plan_items.iter_mut() {
            if let Some(current) = tables.plan_items.get(id) {
                item.revision = current.revision + 1;
            }
        }
        (instances, plan_items)
    }
}

fn check_revision(record: &str, id: &str, current: u64, seen: u64) -> StoreResult<()> {
    if current != seen {
        return Err(StoreError::Stale(format!(
            "{} {} is at revision {}, update was based on {}",
            record, id, current, seen
        )));
    }
    Ok(())
}

impl InstanceStore for InMemoryInstanceStore {
    fn next_instance_id(&self) -> StoreResult<InstanceId> {
        Ok(InstanceId::generate())
    }

    fn next_plan_item_id(&self) -> StoreResult<PlanItemId> {
        Ok(PlanItemId::generate())
    }

    fn get_instance(&self, id: &InstanceId) -> StoreResult<Option<Instance>> {
        let guard = self
            .tables
            .read()
            .map_err(|_| StoreError::Backend("instance tables lock poisoned".to_string()))?;
        Ok(guard.instances.get(id).cloned())
    }

    fn get_plan_item(&self, id: &PlanItemId) -> StoreResult<Option<PlanItem>> {
        let guard = self
            .tables
            .read()
            .map_err(|_| StoreError::Backend("instance tables lock poisoned".to_string()))?;
        Ok(guard.plan_items.get(id).cloned())
    }

    fn children(&self, container: &ContainerRef) -> StoreResult<Vec<PlanItem>> {
        let guard = self
            .tables
            .read()
            .map_err(|_| StoreError::Backend("instance tables lock poisoned".to_string()))?;
        let mut children = guard
            .plan_items
            .values()
            .filter(|item| &item.parent() == container)
            .cloned()
            .collect::<Vec<_>>();
        children.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(children)
    }

    fn apply(&self, changes: ChangeSet) -> StoreResult<()> {
        let mut guard = self
            .tables
            .write()
            .map_err(|_| StoreError::Backend("instance tables lock poisoned".to_string()))?;

        let (preconditions, changes) = changes.into_parts();
        let change_count = changes.len();

        let mut overlay = Overlay::new(&guard);
        for change in changes {
            overlay.stage(change)?;
        }
        if let Some(failed) = preconditions.iter().find(|p| !overlay.holds(p)) {
            return Err(StoreError::PreconditionFailed(failed.clone()));
        }
        let (instances, plan_items) = overlay.into_records();

        for (id, mut instance) in instances {
            instance.transient_variables.clear();
            guard.instances.insert(id, instance);
        }
        for (id, item) in plan_items {
            guard.plan_items.insert(id, item);
        }

        tracing::debug!(changes = change_count, "Change set applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_types::{Definition, PlanItemDefinition, PlanItemKind, PlanItemState, TenantId};
    use serde_json::json;

    fn active_case(id: &str) -> Instance {
        let definition = Definition::new("claim", 1);
        let mut instance = Instance::new(InstanceId::new(id), &definition, TenantId::NoTenant);
        instance.activate();
        instance
    }

    fn item(id: &str, case_id: &str, stage: Option<&str>, kind: PlanItemKind) -> PlanItem {
        PlanItem::new(
            PlanItemId::new(id),
            InstanceId::new(case_id),
            stage.map(PlanItemId::new),
            PlanItemDefinition::new(kind),
        )
    }

    fn seeded() -> InMemoryInstanceStore {
        let store = InMemoryInstanceStore::new();
        let mut set = ChangeSet::new();
        set.push(Change::InsertInstance(active_case("c-1")));
        set.push(Change::InsertPlanItem(item("s-1", "c-1", None, PlanItemKind::Stage)));
        store.apply(set).unwrap();
        store
    }

    #[test]
    fn apply_persists_without_transient_variables() {
        let store = InMemoryInstanceStore::new();
        let mut instance = active_case("c-1");
        instance.variables.insert("a".into(), json!(1));
        instance.transient_variables.insert("t".into(), json!(true));

        let mut set = ChangeSet::new();
        set.push(Change::InsertInstance(instance));
        store.apply(set).unwrap();

        let stored = store.get_instance(&InstanceId::new("c-1")).unwrap().unwrap();
        assert_eq!(stored.variables["a"], json!(1));
        assert!(stored.transient_variables.is_empty());
    }

    #[test]
    fn duplicate_insert_conflicts_and_changes_nothing() {
        let store = seeded();
        let before = store.tables().unwrap();

        let mut set = ChangeSet::new();
        set.push(Change::InsertPlanItem(item("t-1", "c-1", None, PlanItemKind::HumanTask)));
        set.push(Change::InsertInstance(active_case("c-1")));
        let err = store.apply(set).unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.tables().unwrap(), before);
    }

    #[test]
    fn precondition_sees_changes_in_the_same_set() {
        let store = InMemoryInstanceStore::new();
        let mut set = ChangeSet::new();
        set.require(Precondition::ContainerActive(ContainerRef::Case(InstanceId::new("c-9"))));
        set.push(Change::InsertInstance(active_case("c-9")));
        set.push(Change::InsertPlanItem(item("t-1", "c-9", None, PlanItemKind::ServiceTask)));
        store.apply(set).unwrap();

        let children = store
            .children(&ContainerRef::Case(InstanceId::new("c-9")))
            .unwrap();
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn terminated_stage_fails_container_precondition() {
        let store = seeded();
        let mut stage = store.get_plan_item(&PlanItemId::new("s-1")).unwrap().unwrap();
        stage.transition(PlanItemState::Terminated);
        let mut set = ChangeSet::new();
        set.push(Change::UpdatePlanItem(stage));
        store.apply(set).unwrap();

        let container = ContainerRef::Stage(PlanItemId::new("s-1"));
        let mut set = ChangeSet::new();
        set.require(Precondition::ContainerActive(container.clone()));
        set.push(Change::InsertPlanItem(item("t-1", "c-1", Some("s-1"), PlanItemKind::HumanTask)));
        let err = store.apply(set).unwrap_err();

        assert_eq!(
            err,
            StoreError::PreconditionFailed(Precondition::ContainerActive(container.clone()))
        );
        assert!(store.children(&container).unwrap().is_empty());
    }

    #[test]
    fn stage_of_terminated_case_is_not_active() {
        let store = seeded();
        let mut case = store.get_instance(&InstanceId::new("c-1")).unwrap().unwrap();
        case.terminate();
        let mut set = ChangeSet::new();
        set.push(Change::UpdateInstance(case));
        store.apply(set).unwrap();

        let mut set = ChangeSet::new();
        set.require(Precondition::ContainerActive(ContainerRef::Stage(PlanItemId::new("s-1"))));
        assert!(matches!(
            store.apply(set),
            Err(StoreError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn update_of_missing_record_is_not_found() {
        let store = InMemoryInstanceStore::new();
        let mut set = ChangeSet::new();
        set.push(Change::UpdateInstance(active_case("missing")));
        assert!(matches!(store.apply(set), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn plan_item_requires_existing_parent_stage() {
        let store = seeded();
        let mut set = ChangeSet::new();
        set.push(Change::InsertPlanItem(item("t-1", "c-1", Some("nope"), PlanItemKind::HumanTask)));
        assert!(matches!(store.apply(set), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn update_based_on_old_revision_is_stale() {
        let store = seeded();
        let read_early = store.get_plan_item(&PlanItemId::new("s-1")).unwrap().unwrap();

        let mut renamed = read_early.clone();
        renamed.name = Some("Assessment".into());
        let mut set = ChangeSet::new();
        set.push(Change::UpdatePlanItem(renamed));
        store.apply(set).unwrap();

        let mut terminated = read_early;
        terminated.transition(PlanItemState::Terminated);
        let mut set = ChangeSet::new();
        set.push(Change::UpdatePlanItem(terminated));
        let err = store.apply(set).unwrap_err();

        assert!(matches!(err, StoreError::Stale(_)));
        assert!(err.is_transient());
        let stored = store.get_plan_item(&PlanItemId::new("s-1")).unwrap().unwrap();
        assert_eq!(stored.state, PlanItemState::Available);
        assert_eq!(stored.name.as_deref(), Some("Assessment"));
    }

    #[test]
    fn inserting_a_child_advances_the_container_revision() {
        let store = seeded();
        let stage_before = store.get_plan_item(&PlanItemId::new("s-1")).unwrap().unwrap();
        let case_before = store.get_instance(&InstanceId::new("c-1")).unwrap().unwrap();

        let mut set = ChangeSet::new();
        set.push(Change::InsertPlanItem(item("t-1", "c-1", Some("s-1"), PlanItemKind::HumanTask)));
        store.apply(set).unwrap();

        let stage_after = store.get_plan_item(&PlanItemId::new("s-1")).unwrap().unwrap();
        assert_eq!(stage_after.revision, stage_before.revision + 1);
        let case_after = store.get_instance(&InstanceId::new("c-1")).unwrap().unwrap();
        assert_eq!(case_after.revision, case_before.revision);

        let mut stale = stage_before;
        stale.transition(PlanItemState::Terminated);
        let mut set = ChangeSet::new();
        set.push(Change::UpdatePlanItem(stale));
        assert!(matches!(store.apply(set), Err(StoreError::Stale(_))));
    }
}
