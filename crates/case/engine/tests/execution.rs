//! Command execution: rollback, retry, reentrancy and the interceptor chain.

mod common;

use case_engine::mocks::{FailingInterpreter, FlakyInstanceStore, RecordingEventListener};
use case_engine::{
    CaseEngine, CaseError, CaseResult, CommandContext, CommandInterceptor, CommandOutput,
    EngineCommand, EngineConfiguration, ErrorKind, ExecutionInterpreter, InjectPlanItemCmd, Next,
    StartInstanceCmd,
};
use case_store::{InMemoryDefinitionStore, InMemoryInstanceStore, StoreError};
use case_types::{
    ContainerRef, Definition, Instance, PlanItem, PlanItemDefinition, PlanItemKind, PlanItemState,
};
use common::{harness, harness_with};
use std::sync::{Arc, Mutex};

fn flaky_engine(failures: u32) -> (CaseEngine, Arc<FlakyInstanceStore>, Arc<InMemoryInstanceStore>) {
    let definitions =
        Arc::new(InMemoryDefinitionStore::with_definitions([Definition::new("order", 1)]).unwrap());
    let inner = Arc::new(InMemoryInstanceStore::new());
    let flaky = Arc::new(FlakyInstanceStore::new(inner.clone(), failures));
    let engine = CaseEngine::new(
        EngineConfiguration::new(definitions, flaky.clone()).with_settings(common::settings()),
    );
    (engine, flaky, inner)
}

#[test]
fn transient_commit_failures_are_retried_with_a_fresh_context() {
    let (engine, flaky, inner) = flaky_engine(2);

    let instance = engine.start_instance(StartInstanceCmd::by_key("order")).unwrap();

    assert_eq!(flaky.apply_calls(), 3);
    let tables = inner.tables().unwrap();
    assert_eq!(tables.instances.len(), 1);
    assert!(tables.instances.contains_key(&instance.id));
}

#[test]
fn retries_stop_after_max_attempts() {
    let (engine, flaky, inner) = flaky_engine(10);

    let err = engine.start_instance(StartInstanceCmd::by_key("order")).unwrap_err();

    assert!(matches!(err, CaseError::Store(StoreError::Transient(_))));
    assert_eq!(flaky.apply_calls(), 3);
    assert!(inner.tables().unwrap().instances.is_empty());
}

#[test]
fn activation_failure_rolls_back_and_is_not_retried() {
    let h = harness_with(vec![Definition::new("order", 1)], |config| {
        config.with_interpreter(Arc::new(FailingInterpreter::new("no start event")))
    });

    let err = h.engine.start_instance(StartInstanceCmd::by_key("order")).unwrap_err();

    assert_eq!(err, CaseError::Activation("no start event".into()));
    assert!(h.instances.tables().unwrap().instances.is_empty());
    assert!(h.listener.events().is_empty());
}

/// Seeds every new case with a stage by running a nested command.
struct SeedingInterpreter {
    fail_after_seeding: bool,
}

impl ExecutionInterpreter for SeedingInterpreter {
    fn activate_instance(
        &self,
        ctx: &mut CommandContext<'_>,
        instance: &mut Instance,
        _definition: &Definition,
    ) -> CaseResult<()> {
        instance.activate();
        ctx.update_instance(instance.clone());
        ctx.execute(InjectPlanItemCmd::new(
            ContainerRef::Case(instance.id.clone()),
            PlanItemDefinition::new(PlanItemKind::Stage).with_element_id("intake"),
        ))?;
        if self.fail_after_seeding {
            return Err(CaseError::Activation("seeded then failed".into()));
        }
        Ok(())
    }

    fn activate_plan_item(
        &self,
        _ctx: &mut CommandContext<'_>,
        plan_item: &mut PlanItem,
    ) -> CaseResult<()> {
        plan_item.transition(PlanItemState::Active);
        Ok(())
    }
}

#[test]
fn nested_command_joins_the_outer_context() {
    let h = harness_with(vec![Definition::new("claim", 1)], |config| {
        config.with_interpreter(Arc::new(SeedingInterpreter {
            fail_after_seeding: false,
        }))
    });

    let case = h.engine.start_instance(StartInstanceCmd::by_key("claim")).unwrap();

    let children = h.engine.children(&ContainerRef::Case(case.id)).unwrap();
    assert_eq!(children.len(), 1);
    assert!(children[0].is_open_stage());
    assert_eq!(
        h.listener.names(),
        vec![
            "instance_created",
            "plan_item_injected",
            "plan_item_activated",
            "instance_started",
        ]
    );
}

#[test]
fn nested_writes_roll_back_with_the_outer_command() {
    let h = harness_with(vec![Definition::new("claim", 1)], |config| {
        config.with_interpreter(Arc::new(SeedingInterpreter {
            fail_after_seeding: true,
        }))
    });

    let err = h.engine.start_instance(StartInstanceCmd::by_key("claim")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Activation);
    let tables = h.instances.tables().unwrap();
    assert!(tables.instances.is_empty());
    assert!(tables.plan_items.is_empty());
    assert!(h.listener.events().is_empty());
}

/// Records which commands pass through it.
#[derive(Default)]
struct Audit {
    seen: Mutex<Vec<&'static str>>,
}

impl CommandInterceptor for Audit {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn intercept(&self, command: &EngineCommand, next: Next<'_>) -> CaseResult<CommandOutput> {
        self.seen.lock().unwrap().push(command.name());
        next.run(command)
    }
}

#[test]
fn interceptor_chain_is_fixed_per_configuration() {
    let audit = Arc::new(Audit::default());
    let h = harness_with(vec![Definition::new("order", 1)], {
        let audit = audit.clone();
        move |config| config.with_interceptor(audit)
    });

    assert_eq!(
        h.engine.executor().interceptor_names(),
        vec!["logging", "retry", "audit"]
    );

    h.engine.start_instance(StartInstanceCmd::by_key("order")).unwrap();
    let _ = h.engine.start_instance(StartInstanceCmd::default());
    assert_eq!(
        *audit.seen.lock().unwrap(),
        vec!["start_instance", "start_instance"]
    );
}

#[test]
fn listeners_receive_events_in_order_across_commands() {
    let extra = Arc::new(RecordingEventListener::new());
    let h = harness_with(vec![Definition::new("order", 1)], {
        let extra = extra.clone();
        move |config| config.with_listener(extra)
    });

    h.engine.start_instance(StartInstanceCmd::by_key("order")).unwrap();
    assert_eq!(extra.events(), h.listener.events());
}

#[test]
fn read_accessors_do_not_mutate() {
    let h = harness(vec![Definition::new("order", 1)]);
    let instance = h.engine.start_instance(StartInstanceCmd::by_key("order")).unwrap();
    let before = h.instances.tables().unwrap();

    h.engine.instance(&instance.id).unwrap();
    h.engine.children(&ContainerRef::Case(instance.id)).unwrap();

    assert_eq!(h.instances.tables().unwrap(), before);
}
