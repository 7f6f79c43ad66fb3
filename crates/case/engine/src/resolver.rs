//! Definition resolution.
//!
//! Maps a caller's identifying information to exactly one definition. The
//! first matching rule wins:
//!
//! 1. an id is given: look it up by id
//! 2. a key and no tenant (or the no-tenant sentinel): latest no-tenant
//!    version of the key
//! 3. a key and a tenant: latest version for the tenant, optionally falling
//!    back to rule 2
//! 4. neither: invalid argument

use crate::{CaseError, CaseResult, Lookup};
use case_store::DefinitionLookup;
use case_types::{Definition, DefinitionId, TenantId};

/// What the caller knows about the definition to use
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefinitionQuery {
    pub definition_id: Option<DefinitionId>,
    pub definition_key: Option<String>,
    pub tenant_id: Option<TenantId>,
    pub fallback_to_default_tenant: bool,
}

impl DefinitionQuery {
    pub fn by_id(id: impl Into<DefinitionId>) -> Self {
        Self {
            definition_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn by_key(key: impl Into<String>) -> Self {
        Self {
            definition_key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<TenantId>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback_to_default_tenant = fallback;
        self
    }
}

/// Resolves queries against one consistent catalogue view.
pub struct DefinitionResolver<'a> {
    lookup: &'a dyn DefinitionLookup,
}

impl<'a> DefinitionResolver<'a> {
    pub fn new(lookup: &'a dyn DefinitionLookup) -> Self {
        Self { lookup }
    }

    pub fn resolve(&self, query: &DefinitionQuery) -> CaseResult<Definition> {
        if let Some(id) = &query.definition_id {
            let definition = self
                .lookup
                .find_by_id(id)?
                .ok_or_else(|| CaseError::NotFound(Lookup::DefinitionId(id.clone())))?;
            tracing::debug!(definition_id = %id, "Resolved definition by id");
            return Ok(definition);
        }

        let Some(key) = query.definition_key.as_deref() else {
            return Err(CaseError::InvalidArgument(
                "definitionKey and definitionId are null".to_string(),
            ));
        };

        match &query.tenant_id {
            Some(tenant_id) if !tenant_id.is_no_tenant() => {
                self.resolve_for_tenant(key, tenant_id, query.fallback_to_default_tenant)
            }
            _ => {
                let definition = self
                    .lookup
                    .find_latest_by_key(key)?
                    .ok_or_else(|| CaseError::NotFound(Lookup::DefinitionKey(key.to_string())))?;
                tracing::debug!(key, version = definition.version, "Resolved latest definition");
                Ok(definition)
            }
        }
    }

    fn resolve_for_tenant(
        &self,
        key: &str,
        tenant_id: &TenantId,
        fallback: bool,
    ) -> CaseResult<Definition> {
        if let Some(definition) = self.lookup.find_latest_by_key_and_tenant(key, tenant_id)? {
            tracing::debug!(
                key,
                tenant_id = %tenant_id,
                version = definition.version,
                "Resolved latest tenant definition"
            );
            return Ok(definition);
        }

        if !fallback {
            return Err(CaseError::NotFound(Lookup::DefinitionKeyAndTenant {
                key: key.to_string(),
                tenant_id: tenant_id.clone(),
            }));
        }

        let definition = self.lookup.find_latest_by_key(key)?.ok_or_else(|| {
            CaseError::NotFound(Lookup::DefinitionKeyWithFallback(key.to_string()))
        })?;
        tracing::info!(
            key,
            requested_tenant = %tenant_id,
            version = definition.version,
            "Fell back to default tenant definition"
        );
        Ok(definition)
    }
}
