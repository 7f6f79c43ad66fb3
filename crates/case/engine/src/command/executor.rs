use super::{Command, CommandInterceptor, EngineCommand, Next};
use crate::{CaseResult, EngineConfiguration};
use std::sync::Arc;

/// Dispatches commands through the configured interceptor chain.
///
/// The chain is fixed when the executor is built.
pub struct CommandExecutor {
    configuration: Arc<EngineConfiguration>,
    chain: Vec<Arc<dyn CommandInterceptor>>,
}

impl CommandExecutor {
    pub fn new(configuration: EngineConfiguration) -> Self {
        Self::from_shared(Arc::new(configuration))
    }

    pub fn from_shared(configuration: Arc<EngineConfiguration>) -> Self {
        let chain = configuration.interceptor_chain();
        tracing::debug!(
            interceptors = ?chain.iter().map(|i| i.name()).collect::<Vec<_>>(),
            "Command executor ready"
        );
        Self {
            configuration,
            chain,
        }
    }

    pub fn configuration(&self) -> &EngineConfiguration {
        &self.configuration
    }

    /// Names of the interceptors, outermost first.
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|i| i.name()).collect()
    }

    /// Execute a command in its own context.
    ///
    /// Errors raised by the command are returned unchanged after its
    /// context rolled back.
    pub fn execute<C: Command>(&self, command: C) -> CaseResult<C::Output> {
        let command: EngineCommand = command.into();
        let output = Next::new(&self.configuration, &self.chain).run(&command)?;
        C::Output::try_from(output)
    }
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("interceptors", &self.interceptor_names())
            .finish()
    }
}
