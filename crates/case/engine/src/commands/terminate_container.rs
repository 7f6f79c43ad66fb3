use crate::command::{Command, CommandContext, EngineCommand};
use crate::{CaseError, CaseResult, Lookup};
use case_types::{ContainerRef, EngineEvent, PlanItemState};
use chrono::Utc;

/// Terminate a case instance or a stage together with every non-terminal
/// plan item below it.
#[derive(Clone, Debug, PartialEq)]
pub struct TerminateContainerCmd {
    pub container: ContainerRef,
}

impl TerminateContainerCmd {
    pub fn new(container: ContainerRef) -> Self {
        Self { container }
    }
}

impl From<TerminateContainerCmd> for EngineCommand {
    fn from(cmd: TerminateContainerCmd) -> Self {
        EngineCommand::TerminateContainer(cmd)
    }
}

impl Command for TerminateContainerCmd {
    type Output = usize;

    fn execute(&self, ctx: &mut CommandContext<'_>) -> CaseResult<usize> {
        let terminated = match &self.container {
            ContainerRef::Case(case_id) => {
                let mut case = ctx
                    .instance(case_id)?
                    .ok_or_else(|| CaseError::NotFound(Lookup::Instance(case_id.clone())))?;
                if case.is_terminal() {
                    return Err(CaseError::IllegalState(format!(
                        "case instance '{}' is already {:?}",
                        case_id, case.state
                    )));
                }
                let count = terminate_descendants(ctx, &self.container)?;
                case.terminate();
                ctx.update_instance(case);
                count
            }
            ContainerRef::Stage(stage_id) => {
                let mut stage = ctx
                    .plan_item(stage_id)?
                    .ok_or_else(|| CaseError::NotFound(Lookup::PlanItem(stage_id.clone())))?;
                if !stage.is_stage() {
                    return Err(CaseError::InvalidArgument(format!(
                        "plan item '{}' is a {}, not a stage",
                        stage_id,
                        stage.kind()
                    )));
                }
                if stage.state.is_terminal() {
                    return Err(CaseError::IllegalState(format!(
                        "stage '{}' is already {:?}",
                        stage_id, stage.state
                    )));
                }
                let count = terminate_descendants(ctx, &self.container)?;
                stage.transition(PlanItemState::Terminated);
                ctx.update_plan_item(stage);
                count
            }
        };

        ctx.emit(EngineEvent::ContainerTerminated {
            container: self.container.clone(),
            at: Utc::now(),
        });
        tracing::info!(container = %self.container, plan_items = terminated, "Container terminated");
        Ok(terminated)
    }
}

fn terminate_descendants(ctx: &mut CommandContext<'_>, container: &ContainerRef) -> CaseResult<usize> {
    let mut count = 0;
    for mut child in ctx.children(container)? {
        if child.is_stage() {
            count += terminate_descendants(ctx, &ContainerRef::Stage(child.id.clone()))?;
        }
        if !child.state.is_terminal() {
            child.transition(PlanItemState::Terminated);
            ctx.update_plan_item(child);
            count += 1;
        }
    }
    Ok(count)
}
