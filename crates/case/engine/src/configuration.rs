//! Engine configuration: the dependency-injection root.

use crate::command::{CommandInterceptor, LoggingInterceptor, RetryInterceptor};
use crate::{DefaultInterpreter, EngineSettings, EventListener, ExecutionInterpreter};
use case_store::{DefinitionStore, InstanceStore};
use std::sync::Arc;

/// Long-lived collaborators every command context borrows from.
///
/// Built once, then handed to the executor. Nothing in here changes while
/// commands run.
pub struct EngineConfiguration {
    definitions: Arc<dyn DefinitionStore>,
    instances: Arc<dyn InstanceStore>,
    interpreter: Arc<dyn ExecutionInterpreter>,
    listeners: Vec<Arc<dyn EventListener>>,
    interceptors: Vec<Arc<dyn CommandInterceptor>>,
    settings: EngineSettings,
}

impl EngineConfiguration {
    pub fn new(definitions: Arc<dyn DefinitionStore>, instances: Arc<dyn InstanceStore>) -> Self {
        Self {
            definitions,
            instances,
            interpreter: Arc::new(DefaultInterpreter),
            listeners: Vec::new(),
            interceptors: Vec::new(),
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_interpreter(mut self, interpreter: Arc<dyn ExecutionInterpreter>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Add an interceptor inside the built-in logging and retry layers
    pub fn with_interceptor(mut self, interceptor: Arc<dyn CommandInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn definition_store(&self) -> &Arc<dyn DefinitionStore> {
        &self.definitions
    }

    pub fn instance_store(&self) -> &Arc<dyn InstanceStore> {
        &self.instances
    }

    pub fn interpreter(&self) -> &Arc<dyn ExecutionInterpreter> {
        &self.interpreter
    }

    pub fn listeners(&self) -> &[Arc<dyn EventListener>] {
        &self.listeners
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The interceptor chain, outermost first: logging, retry, then custom
    /// interceptors in registration order.
    pub fn interceptor_chain(&self) -> Vec<Arc<dyn CommandInterceptor>> {
        let mut chain: Vec<Arc<dyn CommandInterceptor>> = vec![
            Arc::new(LoggingInterceptor),
            Arc::new(RetryInterceptor::from_config(&self.settings.retry)),
        ];
        chain.extend(self.interceptors.iter().cloned());
        chain
    }
}

impl std::fmt::Debug for EngineConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfiguration")
            .field("listeners", &self.listeners.len())
            .field("interceptors", &self.interceptors.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
