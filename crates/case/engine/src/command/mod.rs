//! Command execution core.
//!
//! Every mutating engine operation is a [`Command`]. Commands are dispatched
//! as an [`EngineCommand`] through the configured interceptor chain, whose
//! innermost step opens a [`CommandContext`], runs the command, then commits
//! or rolls back.

mod context;
mod executor;
mod interceptor;

pub use context::CommandContext;
pub use executor::CommandExecutor;
pub use interceptor::{CommandInterceptor, LoggingInterceptor, Next, RetryInterceptor};

use crate::commands::{InjectPlanItemCmd, StartInstanceCmd, TerminateContainerCmd};
use crate::{CaseError, CaseResult};
use case_types::{Instance, PlanItem};

/// A unit of work executed inside a command context.
///
/// Commands carry only their inputs and hold no state between runs, so a
/// command that has not committed can be executed again.
pub trait Command: Into<EngineCommand> {
    type Output: TryFrom<CommandOutput, Error = CaseError>;

    fn execute(&self, ctx: &mut CommandContext<'_>) -> CaseResult<Self::Output>;
}

/// Every operation the executor can dispatch.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCommand {
    StartInstance(StartInstanceCmd),
    InjectPlanItem(InjectPlanItemCmd),
    TerminateContainer(TerminateContainerCmd),
}

impl EngineCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EngineCommand::StartInstance(_) => "start_instance",
            EngineCommand::InjectPlanItem(_) => "inject_plan_item",
            EngineCommand::TerminateContainer(_) => "terminate_container",
        }
    }

    pub(crate) fn execute(&self, ctx: &mut CommandContext<'_>) -> CaseResult<CommandOutput> {
        match self {
            EngineCommand::StartInstance(cmd) => cmd.execute(ctx).map(CommandOutput::Instance),
            EngineCommand::InjectPlanItem(cmd) => cmd.execute(ctx).map(CommandOutput::PlanItem),
            EngineCommand::TerminateContainer(cmd) => {
                cmd.execute(ctx).map(CommandOutput::Terminated)
            }
        }
    }
}

/// Result of a dispatched command.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutput {
    Instance(Instance),
    PlanItem(PlanItem),
    /// Number of plan items terminated along with the container
    Terminated(usize),
}

impl CommandOutput {
    fn variant(&self) -> &'static str {
        match self {
            CommandOutput::Instance(_) => "instance",
            CommandOutput::PlanItem(_) => "plan item",
            CommandOutput::Terminated(_) => "termination count",
        }
    }
}

fn unexpected(expected: &str, got: &CommandOutput) -> CaseError {
    CaseError::IllegalState(format!(
        "command produced a {} where a {} was expected",
        got.variant(),
        expected
    ))
}

impl TryFrom<CommandOutput> for Instance {
    type Error = CaseError;

    fn try_from(output: CommandOutput) -> CaseResult<Self> {
        match output {
            CommandOutput::Instance(instance) => Ok(instance),
            other => Err(unexpected("instance", &other)),
        }
    }
}

impl TryFrom<CommandOutput> for PlanItem {
    type Error = CaseError;

    fn try_from(output: CommandOutput) -> CaseResult<Self> {
        match output {
            CommandOutput::PlanItem(item) => Ok(item),
            other => Err(unexpected("plan item", &other)),
        }
    }
}

impl TryFrom<CommandOutput> for usize {
    type Error = CaseError;

    fn try_from(output: CommandOutput) -> CaseResult<Self> {
        match output {
            CommandOutput::Terminated(count) => Ok(count),
            other => Err(unexpected("termination count", &other)),
        }
    }
}
