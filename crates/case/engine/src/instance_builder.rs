use crate::commands::StartInstanceCmd;
use crate::{CaseResult, CommandExecutor};
use case_types::{DefinitionId, Instance, InstanceId, TenantId, Variables};

/// Fluent form of [`StartInstanceCmd`].
#[must_use = "an instance builder does nothing until started"]
pub struct InstanceBuilder<'a> {
    executor: &'a CommandExecutor,
    command: StartInstanceCmd,
}

impl<'a> InstanceBuilder<'a> {
    pub fn new(executor: &'a CommandExecutor) -> Self {
        Self {
            executor,
            command: StartInstanceCmd::default(),
        }
    }

    pub fn definition_key(mut self, key: impl Into<String>) -> Self {
        self.command.definition_key = Some(key.into());
        self
    }

    pub fn definition_id(mut self, id: impl Into<DefinitionId>) -> Self {
        self.command.definition_id = Some(id.into());
        self
    }

    pub fn business_key(mut self, business_key: impl Into<String>) -> Self {
        self.command.business_key = Some(business_key.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.command.name = Some(name.into());
        self
    }

    pub fn tenant_id(mut self, tenant_id: impl Into<TenantId>) -> Self {
        self.command.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn override_definition_tenant_id(mut self, tenant_id: impl Into<TenantId>) -> Self {
        self.command.override_definition_tenant_id = Some(tenant_id.into());
        self
    }

    pub fn predefined_id(mut self, id: impl Into<InstanceId>) -> Self {
        self.command.predefined_id = Some(id.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.command.variables.insert(name.into(), value);
        self
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.command.variables.extend(variables);
        self
    }

    pub fn transient_variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.command.transient_variables.insert(name.into(), value);
        self
    }

    pub fn transient_variables(mut self, variables: Variables) -> Self {
        self.command.transient_variables.extend(variables);
        self
    }

    pub fn callback(mut self, callback_id: impl Into<String>, callback_type: impl Into<String>) -> Self {
        self.command.callback_id = Some(callback_id.into());
        self.command.callback_type = Some(callback_type.into());
        self
    }

    pub fn fallback_to_default_tenant(mut self, fallback: bool) -> Self {
        self.command.fallback_to_default_tenant = Some(fallback);
        self
    }

    /// The command this builder would execute.
    pub fn command(&self) -> &StartInstanceCmd {
        &self.command
    }

    pub fn start(self) -> CaseResult<Instance> {
        self.executor.execute(self.command)
    }
}
