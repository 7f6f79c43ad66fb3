//! Injecting plan items into running cases and stages.

mod common;

use case_engine::mocks::RecordingInterpreter;
use case_engine::{
    CaseResult, CommandContext, ErrorKind, ExecutionInterpreter, StartInstanceCmd,
    TerminateContainerCmd,
};
use case_store::{Change, ChangeSet, InMemoryInstanceStore, InstanceStore};
use case_types::{
    ContainerRef, Definition, DefinitionKind, Instance, PlanItem, PlanItemDefinition, PlanItemId,
    PlanItemKind, PlanItemState,
};
use common::{harness, harness_with, Harness};
use serde_json::json;
use std::sync::Arc;

fn case_definition() -> Definition {
    Definition::new("claim", 1).with_kind(DefinitionKind::Case)
}

fn start_case(h: &Harness) -> Instance {
    h.engine.start_instance(StartInstanceCmd::by_key("claim")).unwrap()
}

fn add_stage(h: &Harness, case: &Instance) -> PlanItem {
    h.engine
        .new_injection_builder()
        .inject_into_case(case.id.clone())
        .kind(PlanItemKind::Stage)
        .name("Assessment")
        .submit()
        .unwrap()
}

#[test]
fn injected_item_becomes_active_child_of_case() {
    let h = harness(vec![case_definition()]);
    let case = start_case(&h);

    let item = h
        .engine
        .new_injection_builder()
        .inject_into_case(case.id.clone())
        .kind(PlanItemKind::HumanTask)
        .name("Call customer")
        .variable("phone", json!("555-0100"))
        .submit()
        .unwrap();

    let container = ContainerRef::Case(case.id.clone());
    let children = h.engine.children(&container).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, item.id);
    assert_eq!(children[0].state, PlanItemState::Active);
    assert_eq!(children[0].variables["phone"], json!("555-0100"));
    assert_eq!(children[0].parent(), container);
    assert_eq!(children[0].tenant_id, case.tenant_id);
}

#[test]
fn injected_item_becomes_active_child_of_stage() {
    let h = harness(vec![case_definition()]);
    let case = start_case(&h);
    let stage = add_stage(&h, &case);

    let task = h
        .engine
        .new_injection_builder()
        .inject_into_stage(stage.id.clone())
        .kind(PlanItemKind::ServiceTask)
        .submit()
        .unwrap();

    assert_eq!(task.stage_id.as_ref(), Some(&stage.id));
    assert_eq!(task.case_instance_id, case.id);
    let stored = h.engine.plan_item(&task.id).unwrap().unwrap();
    assert_eq!(stored.state, PlanItemState::Active);
    assert_eq!(
        h.engine.children(&ContainerRef::Stage(stage.id)).unwrap().len(),
        1
    );
}

#[test]
fn injection_events_follow_commit() {
    let h = harness(vec![case_definition()]);
    let case = start_case(&h);
    add_stage(&h, &case);

    assert_eq!(
        h.listener.names(),
        vec![
            "instance_created",
            "instance_started",
            "plan_item_injected",
            "plan_item_activated",
        ]
    );
}

#[test]
fn injection_into_terminated_stage_is_illegal_and_changes_nothing() {
    let h = harness(vec![case_definition()]);
    let case = start_case(&h);
    let stage = add_stage(&h, &case);
    h.engine
        .terminate(ContainerRef::Stage(stage.id.clone()))
        .unwrap();
    let before = h.instances.tables().unwrap();

    let err = h
        .engine
        .new_injection_builder()
        .inject_into_stage(stage.id.clone())
        .kind(PlanItemKind::HumanTask)
        .submit()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IllegalState);
    assert_eq!(h.instances.tables().unwrap(), before);
    assert!(h
        .engine
        .children(&ContainerRef::Stage(stage.id))
        .unwrap()
        .is_empty());
}

#[test]
fn injection_into_terminated_case_is_illegal() {
    let h = harness(vec![case_definition()]);
    let case = start_case(&h);
    let stage = add_stage(&h, &case);
    let terminated = h.engine.terminate(ContainerRef::Case(case.id.clone())).unwrap();
    assert_eq!(terminated, 1);

    for target in [
        ContainerRef::Case(case.id.clone()),
        ContainerRef::Stage(stage.id.clone()),
    ] {
        let err = h
            .engine
            .new_injection_builder()
            .target(target)
            .kind(PlanItemKind::Milestone)
            .submit()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalState);
    }
}

#[test]
fn injection_into_missing_container_is_not_found() {
    let h = harness(vec![case_definition()]);
    let err = h
        .engine
        .new_injection_builder()
        .inject_into_case("nope")
        .kind(PlanItemKind::HumanTask)
        .submit()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h
        .engine
        .new_injection_builder()
        .inject_into_stage("nope")
        .kind(PlanItemKind::HumanTask)
        .submit()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn injection_into_non_stage_plan_item_is_invalid() {
    let h = harness(vec![case_definition()]);
    let case = start_case(&h);
    let task = h
        .engine
        .new_injection_builder()
        .inject_into_case(case.id.clone())
        .kind(PlanItemKind::HumanTask)
        .submit()
        .unwrap();

    let err = h
        .engine
        .new_injection_builder()
        .inject_into_stage(task.id)
        .kind(PlanItemKind::HumanTask)
        .submit()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn terminating_a_case_cascades_through_stages() {
    let h = harness(vec![case_definition()]);
    let case = start_case(&h);
    let stage = add_stage(&h, &case);
    let nested = h
        .engine
        .new_injection_builder()
        .inject_into_stage(stage.id.clone())
        .kind(PlanItemKind::HumanTask)
        .submit()
        .unwrap();

    let count = h.engine.terminate(ContainerRef::Case(case.id.clone())).unwrap();
    assert_eq!(count, 2);

    let case = h.engine.instance(&case.id).unwrap().unwrap();
    assert!(case.is_terminal());
    assert!(case.ended_at.is_some());
    for id in [&stage.id, &nested.id] {
        let item = h.engine.plan_item(id).unwrap().unwrap();
        assert_eq!(item.state, PlanItemState::Terminated);
    }

    let err = h.engine.terminate(ContainerRef::Case(case.id)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalState);
}

/// Terminates the target case through the store while the injection is
/// still uncommitted, as a concurrent caller would.
struct ConcurrentTermination {
    store: Arc<InMemoryInstanceStore>,
}

impl ExecutionInterpreter for ConcurrentTermination {
    fn activate_instance(
        &self,
        _ctx: &mut CommandContext<'_>,
        instance: &mut Instance,
        _definition: &Definition,
    ) -> CaseResult<()> {
        instance.activate();
        Ok(())
    }

    fn activate_plan_item(
        &self,
        _ctx: &mut CommandContext<'_>,
        plan_item: &mut PlanItem,
    ) -> CaseResult<()> {
        let mut case = self
            .store
            .get_instance(&plan_item.case_instance_id)?
            .expect("case exists");
        case.terminate();
        let mut set = ChangeSet::new();
        set.push(Change::UpdateInstance(case));
        self.store.apply(set)?;

        plan_item.transition(PlanItemState::Active);
        Ok(())
    }
}

#[test]
fn container_is_rechecked_at_commit() {
    let store = Arc::new(InMemoryInstanceStore::new());
    let h = harness_with(vec![case_definition()], {
        let store = store.clone();
        move |_| {
            let definitions = Arc::new(
                case_store::InMemoryDefinitionStore::with_definitions([case_definition()])
                    .unwrap(),
            );
            case_engine::EngineConfiguration::new(definitions, store.clone())
                .with_settings(common::settings())
                .with_interpreter(Arc::new(ConcurrentTermination { store }))
        }
    });
    let case = start_case(&h);

    let err = h
        .engine
        .new_injection_builder()
        .inject_into_case(case.id.clone())
        .kind(PlanItemKind::HumanTask)
        .submit()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IllegalState);
    assert!(store
        .children(&ContainerRef::Case(case.id.clone()))
        .unwrap()
        .is_empty());
    assert!(store.get_instance(&case.id).unwrap().unwrap().is_terminal());
}

#[test]
fn element_reference_is_preserved() {
    let h = harness(vec![case_definition()]);
    let case = start_case(&h);
    let item = h
        .engine
        .new_injection_builder()
        .inject_into_case(case.id)
        .definition(
            PlanItemDefinition::new(PlanItemKind::ProcessTask)
                .with_element_id("escalate")
                .with_definition_id("claim:1"),
        )
        .submit()
        .unwrap();
    assert_eq!(item.definition.element_id.as_deref(), Some("escalate"));
    assert_eq!(item.kind(), PlanItemKind::ProcessTask);
    assert!(h.engine.plan_item(&PlanItemId::new("missing")).unwrap().is_none());
}

#[test]
fn termination_racing_an_injection_does_not_orphan_the_new_child() {
    let h = harness(vec![case_definition()]);
    let case = start_case(&h);
    let stage = add_stage(&h, &case);
    let container = ContainerRef::Stage(stage.id.clone());

    let mut ctx = CommandContext::open(h.engine.configuration(), "terminate_container").unwrap();
    let terminated = ctx.execute(TerminateContainerCmd::new(container.clone())).unwrap();
    assert_eq!(terminated, 0);

    let child = h
        .engine
        .new_injection_builder()
        .inject_into_stage(stage.id.clone())
        .kind(PlanItemKind::HumanTask)
        .submit()
        .unwrap();

    let err = ctx.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
    assert!(err.is_transient());

    let stored_stage = h.engine.plan_item(&stage.id).unwrap().unwrap();
    assert_eq!(stored_stage.state, PlanItemState::Active);
    let stored_child = h.engine.plan_item(&child.id).unwrap().unwrap();
    assert_eq!(stored_child.state, PlanItemState::Active);
    assert!(!h.listener.names().contains(&"container_terminated"));

    // Run again from scratch, the termination now covers the new child.
    assert_eq!(h.engine.terminate(container).unwrap(), 1);
    let stored_child = h.engine.plan_item(&child.id).unwrap().unwrap();
    assert_eq!(stored_child.state, PlanItemState::Terminated);
}

#[test]
fn concurrent_terminations_of_one_stage_commit_once() {
    let h = harness(vec![case_definition()]);
    let case = start_case(&h);
    let stage = add_stage(&h, &case);
    let container = ContainerRef::Stage(stage.id.clone());

    let mut first = CommandContext::open(h.engine.configuration(), "terminate_container").unwrap();
    first.execute(TerminateContainerCmd::new(container.clone())).unwrap();
    let mut second = CommandContext::open(h.engine.configuration(), "terminate_container").unwrap();
    second.execute(TerminateContainerCmd::new(container.clone())).unwrap();

    first.commit().unwrap();
    let err = second.commit().unwrap_err();
    assert!(err.is_transient());

    let terminations = h
        .listener
        .names()
        .into_iter()
        .filter(|name| *name == "container_terminated")
        .count();
    assert_eq!(terminations, 1);

    let err = h.engine.terminate(container).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalState);
}

#[test]
fn interpreter_activates_only_committed_injections() {
    let interpreter = Arc::new(RecordingInterpreter::new());
    let h = harness_with(vec![case_definition()], {
        let interpreter = interpreter.clone();
        move |config| config.with_interpreter(interpreter)
    });
    let case = start_case(&h);
    let stage = add_stage(&h, &case);
    assert_eq!(interpreter.plan_items_seen(), vec![stage.id.clone()]);

    h.engine.terminate(ContainerRef::Stage(stage.id.clone())).unwrap();
    h.engine
        .new_injection_builder()
        .inject_into_stage(stage.id.clone())
        .kind(PlanItemKind::Milestone)
        .submit()
        .unwrap_err();

    assert_eq!(interpreter.plan_items_seen(), vec![stage.id]);
}
