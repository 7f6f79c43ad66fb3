//! Dynamic injection of plan items into running cases.

use crate::commands::InjectPlanItemCmd;
use crate::{CaseError, CaseResult, CommandExecutor};
use case_types::{
    ContainerRef, InstanceId, PlanItem, PlanItemDefinition, PlanItemId, PlanItemKind, Variables,
};

/// Fluent construction of a plan item injection.
///
/// Every method takes the builder by value and `build`/`submit` consume it,
/// so one builder can submit at most one injection.
///
/// ```ignore
/// let task = engine
///     .new_injection_builder()
///     .inject_into_stage(stage_id)
///     .kind(PlanItemKind::HumanTask)
///     .name("Review claim")
///     .variable("reviewer", json!("kim"))
///     .submit()?;
/// ```
#[must_use = "an injection builder does nothing until submitted"]
pub struct InjectionBuilder<'a> {
    executor: &'a CommandExecutor,
    target: Option<ContainerRef>,
    definition: Option<PlanItemDefinition>,
    name: Option<String>,
    variables: Variables,
}

impl<'a> InjectionBuilder<'a> {
    pub fn new(executor: &'a CommandExecutor) -> Self {
        Self {
            executor,
            target: None,
            definition: None,
            name: None,
            variables: Variables::new(),
        }
    }

    pub fn target(mut self, target: ContainerRef) -> Self {
        self.target = Some(target);
        self
    }

    pub fn inject_into_case(self, case_id: impl Into<InstanceId>) -> Self {
        self.target(ContainerRef::Case(case_id.into()))
    }

    pub fn inject_into_stage(self, stage_id: impl Into<PlanItemId>) -> Self {
        self.target(ContainerRef::Stage(stage_id.into()))
    }

    /// Type of the unit to inject, keeping any element reference already set
    pub fn kind(mut self, kind: PlanItemKind) -> Self {
        self.definition = Some(match self.definition.take() {
            Some(mut definition) => {
                definition.kind = kind;
                definition
            }
            None => PlanItemDefinition::new(kind),
        });
        self
    }

    pub fn definition(mut self, definition: PlanItemDefinition) -> Self {
        self.definition = Some(definition);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables.extend(variables);
        self
    }

    /// Validate the accumulated fields into a command. Mutates nothing.
    pub fn build(self) -> CaseResult<InjectPlanItemCmd> {
        let target = self.target.ok_or_else(|| {
            CaseError::InvalidArgument("target container is required for injection".to_string())
        })?;
        let definition = self.definition.ok_or_else(|| {
            CaseError::InvalidArgument("plan item type is required for injection".to_string())
        })?;
        let mut command = InjectPlanItemCmd::new(target, definition).with_variables(self.variables);
        if let Some(name) = self.name {
            command = command.with_name(name);
        }
        Ok(command)
    }

    /// Build and execute the injection as one command.
    pub fn submit(self) -> CaseResult<PlanItem> {
        let executor = self.executor;
        let command = self.build()?;
        executor.execute(command)
    }
}
