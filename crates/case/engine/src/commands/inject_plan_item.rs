use crate::command::{Command, CommandContext, EngineCommand};
use crate::{CaseError, CaseResult, Lookup};
use case_store::{InstanceStore, Precondition};
use case_types::{
    ContainerRef, EngineEvent, InstanceId, PlanItem, PlanItemDefinition, PlanItemId, PlanItemState,
    TenantId, Variables,
};
use chrono::Utc;

/// Insert a new plan item into a running case or an active stage.
///
/// Callers usually go through [`InjectionBuilder`](crate::InjectionBuilder).
/// Hooks running inside a context construct it directly and pass it to
/// [`CommandContext::execute`].
#[derive(Clone, Debug, PartialEq)]
pub struct InjectPlanItemCmd {
    target: ContainerRef,
    definition: PlanItemDefinition,
    name: Option<String>,
    variables: Variables,
}

/// Where a new plan item goes, once the target has been checked.
struct Placement {
    case_instance_id: InstanceId,
    stage_id: Option<PlanItemId>,
    tenant_id: TenantId,
}

impl InjectPlanItemCmd {
    pub fn new(target: ContainerRef, definition: PlanItemDefinition) -> Self {
        Self {
            target,
            definition,
            name: None,
            variables: Variables::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn target(&self) -> &ContainerRef {
        &self.target
    }

    pub fn definition(&self) -> &PlanItemDefinition {
        &self.definition
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    fn place(&self, ctx: &CommandContext<'_>) -> CaseResult<Placement> {
        match &self.target {
            ContainerRef::Case(case_id) => {
                let case = ctx
                    .instance(case_id)?
                    .ok_or_else(|| CaseError::NotFound(Lookup::Instance(case_id.clone())))?;
                if !case.is_active() {
                    return Err(CaseError::IllegalState(format!(
                        "case instance '{}' is not active",
                        case_id
                    )));
                }
                Ok(Placement {
                    case_instance_id: case.id,
                    stage_id: None,
                    tenant_id: case.tenant_id,
                })
            }
            ContainerRef::Stage(stage_id) => {
                let stage = ctx
                    .plan_item(stage_id)?
                    .ok_or_else(|| CaseError::NotFound(Lookup::PlanItem(stage_id.clone())))?;
                if !stage.is_stage() {
                    return Err(CaseError::InvalidArgument(format!(
                        "plan item '{}' is a {}, not a stage",
                        stage_id,
                        stage.kind()
                    )));
                }
                let case = ctx.instance(&stage.case_instance_id)?.ok_or_else(|| {
                    CaseError::NotFound(Lookup::Instance(stage.case_instance_id.clone()))
                })?;
                if !stage.is_open_stage() || !case.is_active() {
                    return Err(CaseError::IllegalState(format!(
                        "stage '{}' is not active",
                        stage_id
                    )));
                }
                Ok(Placement {
                    case_instance_id: case.id,
                    stage_id: Some(stage.id),
                    tenant_id: case.tenant_id,
                })
            }
        }
    }
}

impl From<InjectPlanItemCmd> for EngineCommand {
    fn from(cmd: InjectPlanItemCmd) -> Self {
        EngineCommand::InjectPlanItem(cmd)
    }
}

impl Command for InjectPlanItemCmd {
    type Output = PlanItem;

    fn execute(&self, ctx: &mut CommandContext<'_>) -> CaseResult<PlanItem> {
        let placement = self.place(ctx)?;
        // Re-checked when the store applies the changes.
        ctx.require(Precondition::ContainerActive(self.target.clone()));

        let configuration = ctx.configuration();
        let id = configuration.instance_store().next_plan_item_id()?;
        let mut item = PlanItem::new(
            id,
            placement.case_instance_id,
            placement.stage_id,
            self.definition.clone(),
        );
        item.name = self.name.clone();
        item.variables = self.variables.clone();
        item.tenant_id = placement.tenant_id;

        ctx.insert_plan_item(item.clone());
        ctx.emit(EngineEvent::PlanItemInjected {
            plan_item_id: item.id.clone(),
            container: self.target.clone(),
            kind: item.kind(),
            at: Utc::now(),
        });

        configuration.interpreter().activate_plan_item(ctx, &mut item)?;
        ctx.update_plan_item(item.clone());
        if item.state == PlanItemState::Active {
            ctx.emit(EngineEvent::PlanItemActivated {
                plan_item_id: item.id.clone(),
                at: Utc::now(),
            });
        }

        tracing::info!(
            plan_item_id = %item.id,
            container = %self.target,
            kind = %item.kind(),
            state = ?item.state,
            "Plan item injected"
        );
        Ok(item)
    }
}
