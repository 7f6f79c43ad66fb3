use crate::commands::{StartInstanceCmd, TerminateContainerCmd};
use crate::{
    CaseResult, Command, CommandExecutor, EngineConfiguration, InjectionBuilder, InstanceBuilder,
};
use case_store::InstanceStore;
use case_types::{ContainerRef, Instance, InstanceId, PlanItem, PlanItemId};

/// Entry point for callers of the case engine.
///
/// Every mutating method runs exactly one command through the executor.
/// Read accessors go straight to the instance store.
#[derive(Debug)]
pub struct CaseEngine {
    executor: CommandExecutor,
}

impl CaseEngine {
    pub fn new(configuration: EngineConfiguration) -> Self {
        Self {
            executor: CommandExecutor::new(configuration),
        }
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    pub fn configuration(&self) -> &EngineConfiguration {
        self.executor.configuration()
    }

    pub fn execute<C: Command>(&self, command: C) -> CaseResult<C::Output> {
        self.executor.execute(command)
    }

    // ── Instances ────────────────────────────────────────────────────

    pub fn start_instance(&self, request: StartInstanceCmd) -> CaseResult<Instance> {
        self.executor.execute(request)
    }

    pub fn instance_builder(&self) -> InstanceBuilder<'_> {
        InstanceBuilder::new(&self.executor)
    }

    /// Terminate a case instance or stage and everything below it.
    ///
    /// Returns the number of plan items terminated along with it.
    pub fn terminate(&self, container: ContainerRef) -> CaseResult<usize> {
        self.executor.execute(TerminateContainerCmd::new(container))
    }

    // ── Injection ────────────────────────────────────────────────────

    pub fn new_injection_builder(&self) -> InjectionBuilder<'_> {
        InjectionBuilder::new(&self.executor)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn instance(&self, id: &InstanceId) -> CaseResult<Option<Instance>> {
        Ok(self.configuration().instance_store().get_instance(id)?)
    }

    pub fn plan_item(&self, id: &PlanItemId) -> CaseResult<Option<PlanItem>> {
        Ok(self.configuration().instance_store().get_plan_item(id)?)
    }

    pub fn children(&self, container: &ContainerRef) -> CaseResult<Vec<PlanItem>> {
        Ok(self.configuration().instance_store().children(container)?)
    }
}
