use crate::command::{Command, CommandContext, EngineCommand};
use crate::{
    CaseResult, CreateInstanceParams, DefinitionQuery, DefinitionResolver, InstanceCreationService,
};
use case_types::{DefinitionId, Instance, InstanceId, TenantId, Variables};

/// Start a new instance of a definition.
///
/// The definition is resolved by id or by key (and tenant) inside the same
/// context that persists the instance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StartInstanceCmd {
    pub definition_key: Option<String>,
    pub definition_id: Option<DefinitionId>,
    pub business_key: Option<String>,
    pub name: Option<String>,
    /// Tenant used to resolve the definition
    pub tenant_id: Option<TenantId>,
    /// Tenant assigned to the instance instead of the definition's own
    pub override_definition_tenant_id: Option<TenantId>,
    pub predefined_id: Option<InstanceId>,
    pub variables: Variables,
    pub transient_variables: Variables,
    pub callback_id: Option<String>,
    pub callback_type: Option<String>,
    /// Falls back to the engine setting when unset
    pub fallback_to_default_tenant: Option<bool>,
}

impl StartInstanceCmd {
    pub fn by_key(key: impl Into<String>) -> Self {
        Self {
            definition_key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn by_id(id: impl Into<DefinitionId>) -> Self {
        Self {
            definition_id: Some(id.into()),
            ..Default::default()
        }
    }

    fn query(&self, default_fallback: bool) -> DefinitionQuery {
        DefinitionQuery {
            definition_id: self.definition_id.clone(),
            definition_key: self.definition_key.clone(),
            tenant_id: self.tenant_id.clone(),
            fallback_to_default_tenant: self.fallback_to_default_tenant.unwrap_or(default_fallback),
        }
    }
}

impl From<StartInstanceCmd> for EngineCommand {
    fn from(cmd: StartInstanceCmd) -> Self {
        EngineCommand::StartInstance(cmd)
    }
}

impl Command for StartInstanceCmd {
    type Output = Instance;

    fn execute(&self, ctx: &mut CommandContext<'_>) -> CaseResult<Instance> {
        let settings = ctx.configuration().settings();
        let query = self.query(settings.default_fallback_to_default_tenant);
        let definition = DefinitionResolver::new(ctx.definitions()).resolve(&query)?;

        InstanceCreationService::create_instance(
            ctx,
            CreateInstanceParams {
                definition,
                business_key: self.business_key.clone(),
                name: self.name.clone(),
                tenant_override: self.override_definition_tenant_id.clone(),
                predefined_id: self.predefined_id.clone(),
                variables: self.variables.clone(),
                transient_variables: self.transient_variables.clone(),
                callback_id: self.callback_id.clone(),
                callback_type: self.callback_type.clone(),
                fire_events: settings.fire_events,
            },
        )
    }
}
