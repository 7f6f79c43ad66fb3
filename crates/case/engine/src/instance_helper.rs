//! Instance creation.

use crate::{CaseResult, CommandContext};
use case_store::InstanceStore;
use case_types::{Definition, EngineEvent, Instance, InstanceId, TenantId, Variables};
use chrono::Utc;

/// Everything needed to create an instance of an already resolved
/// definition.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateInstanceParams {
    pub definition: Definition,
    pub business_key: Option<String>,
    pub name: Option<String>,
    /// Tenant for the instance; the definition's tenant when unset
    pub tenant_override: Option<TenantId>,
    /// Used verbatim as the instance id. Uniqueness is enforced by the store.
    pub predefined_id: Option<InstanceId>,
    pub variables: Variables,
    /// Visible to activation only, never persisted
    pub transient_variables: Variables,
    pub callback_id: Option<String>,
    pub callback_type: Option<String>,
    pub fire_events: bool,
}

impl CreateInstanceParams {
    pub fn new(definition: Definition) -> Self {
        Self {
            definition,
            business_key: None,
            name: None,
            tenant_override: None,
            predefined_id: None,
            variables: Variables::new(),
            transient_variables: Variables::new(),
            callback_id: None,
            callback_type: None,
            fire_events: true,
        }
    }
}

/// Creates instances inside a command context.
pub struct InstanceCreationService;

impl InstanceCreationService {
    /// Stage a new instance of `params.definition` and activate it.
    ///
    /// Persistent variables start from the definition's data objects, with
    /// caller variables taking precedence. The returned instance carries no
    /// transient variables.
    pub fn create_instance(
        ctx: &mut CommandContext<'_>,
        params: CreateInstanceParams,
    ) -> CaseResult<Instance> {
        let CreateInstanceParams {
            definition,
            business_key,
            name,
            tenant_override,
            predefined_id,
            variables,
            transient_variables,
            callback_id,
            callback_type,
            fire_events,
        } = params;
        let configuration = ctx.configuration();

        let tenant_id = tenant_override.unwrap_or_else(|| definition.tenant_id.clone());
        let id = match predefined_id {
            Some(id) => id,
            None => configuration.instance_store().next_instance_id()?,
        };

        let mut instance = Instance::new(id, &definition, tenant_id);
        instance.business_key = business_key;
        instance.name = name;
        instance.callback_id = callback_id;
        instance.callback_type = callback_type;
        instance.variables = definition.initial_variables();
        instance.variables.extend(variables);
        instance.transient_variables = transient_variables;

        ctx.insert_instance(instance.clone());
        if fire_events {
            ctx.emit(EngineEvent::InstanceCreated {
                instance_id: instance.id.clone(),
                definition_id: definition.id.clone(),
                tenant_id: instance.tenant_id.clone(),
                at: Utc::now(),
            });
        }

        configuration
            .interpreter()
            .activate_instance(ctx, &mut instance, &definition)?;

        let discarded = std::mem::take(&mut instance.transient_variables);
        ctx.update_instance(instance.clone());
        if fire_events && instance.is_active() {
            ctx.emit(EngineEvent::InstanceStarted {
                instance_id: instance.id.clone(),
                at: Utc::now(),
            });
        }

        tracing::info!(
            instance_id = %instance.id,
            definition_id = %definition.id,
            definition_version = definition.version,
            tenant_id = %instance.tenant_id,
            variables = instance.variables.len(),
            transient_variables = discarded.len(),
            "Instance created"
        );
        Ok(instance)
    }
}
