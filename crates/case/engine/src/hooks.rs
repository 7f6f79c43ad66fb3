//! Collaborator hooks: the execution interpreter and event listeners.

use crate::{CaseResult, CommandContext};
use case_types::{Definition, EngineEvent, Instance, PlanItem, PlanItemState};

/// Begins the live behavior of freshly persisted instances and plan items.
///
/// Hooks run inside the creating command's context. They may stage further
/// changes or run nested commands through `ctx`, and any error they return
/// rolls the whole command back.
pub trait ExecutionInterpreter: Send + Sync {
    /// Called after the instance has been staged. Transient variables are
    /// still present on `instance` at this point.
    fn activate_instance(
        &self,
        ctx: &mut CommandContext<'_>,
        instance: &mut Instance,
        definition: &Definition,
    ) -> CaseResult<()>;

    /// Called after an injected plan item has been staged.
    fn activate_plan_item(
        &self,
        ctx: &mut CommandContext<'_>,
        plan_item: &mut PlanItem,
    ) -> CaseResult<()>;
}

/// Activates everything immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultInterpreter;

impl ExecutionInterpreter for DefaultInterpreter {
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
        plan_item.transition(PlanItemState::Active);
        Ok(())
    }
}

/// Receives engine events after the producing command committed.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}
