use crate::{DefinitionLookup, DefinitionStore, StoreError, StoreResult};
use case_types::{Definition, DefinitionDraft, DefinitionId, TenantId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Immutable-once-shared catalogue of definitions.
///
/// Versions are indexed per (key, tenant) so "latest" is the last entry of
/// an ordered map.
#[derive(Clone, Debug, Default)]
pub struct DefinitionCatalogue {
    by_id: HashMap<DefinitionId, Definition>,
    by_key: HashMap<(String, TenantId), BTreeMap<u32, DefinitionId>>,
}

impl DefinitionCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(definitions: impl IntoIterator<Item = Definition>) -> StoreResult<Self> {
        let mut catalogue = Self::new();
        for definition in definitions {
            catalogue.insert(definition)?;
        }
        Ok(catalogue)
    }

    /// Add a definition. Ids and (key, tenant, version) triples are unique.
    pub fn insert(&mut self, definition: Definition) -> StoreResult<()> {
        if self.by_id.contains_key(&definition.id) {
            return Err(StoreError::Conflict(format!(
                "definition {} already exists",
                definition.id
            )));
        }

        let index_key = (definition.key.clone(), definition.tenant_id.clone());
        let versions = self.by_key.entry(index_key).or_default();
        if versions.contains_key(&definition.version) {
            return Err(StoreError::Conflict(format!(
                "definition '{}' version {} already exists for tenant {}",
                definition.key, definition.version, definition.tenant_id
            )));
        }

        versions.insert(definition.version, definition.id.clone());
        self.by_id.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// The version the next deployment of (key, tenant) receives.
    pub fn next_version(&self, key: &str, tenant_id: &TenantId) -> u32 {
        self.by_key
            .get(&(key.to_string(), tenant_id.clone()))
            .and_then(|versions| versions.keys().next_back())
            .map_or(1, |latest| latest + 1)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn latest(&self, key: &str, tenant_id: &TenantId) -> Option<Definition> {
        self.by_key
            .get(&(key.to_string(), tenant_id.clone()))
            .and_then(|versions| versions.values().next_back())
            .and_then(|id| self.by_id.get(id))
            .cloned()
    }
}

impl DefinitionLookup for DefinitionCatalogue {
    fn find_by_id(&self, id: &DefinitionId) -> StoreResult<Option<Definition>> {
        Ok(self.by_id.get(id).cloned())
    }

    fn find_latest_by_key(&self, key: &str) -> StoreResult<Option<Definition>> {
        Ok(self.latest(key, &TenantId::NoTenant))
    }

    fn find_latest_by_key_and_tenant(
        &self,
        key: &str,
        tenant_id: &TenantId,
    ) -> StoreResult<Option<Definition>> {
        Ok(self.latest(key, tenant_id))
    }
}

/// In-memory definition store.
///
/// Writers copy the catalogue when snapshots are outstanding, so a snapshot
/// taken by a running command never observes a concurrent deployment.
#[derive(Default)]
pub struct InMemoryDefinitionStore {
    catalogue: RwLock<Arc<DefinitionCatalogue>>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definitions(definitions: impl IntoIterator<Item = Definition>) -> StoreResult<Self> {
        let catalogue = DefinitionCatalogue::from_definitions(definitions)?;
        Ok(Self {
            catalogue: RwLock::new(Arc::new(catalogue)),
        })
    }

    /// Deploy a draft as the next version for its (key, tenant).
    pub fn deploy(&self, draft: DefinitionDraft) -> StoreResult<Definition> {
        let mut guard = self
            .catalogue
            .write()
            .map_err(|_| StoreError::Backend("definition catalogue lock poisoned".to_string()))?;
        let catalogue = Arc::make_mut(&mut *guard);

        let version = catalogue.next_version(&draft.key, &draft.tenant_id);
        let definition = draft.into_definition(DefinitionId::generate(), version);
        catalogue.insert(definition.clone())?;

        tracing::debug!(
            definition_id = %definition.id,
            key = %definition.key,
            version = definition.version,
            tenant_id = %definition.tenant_id,
            "Definition deployed"
        );
        Ok(definition)
    }

    /// Insert a definition with an explicit id and version.
    pub fn insert(&self, definition: Definition) -> StoreResult<()> {
        let mut guard = self
            .catalogue
            .write()
            .map_err(|_| StoreError::Backend("definition catalogue lock poisoned".to_string()))?;
        Arc::make_mut(&mut *guard).insert(definition)
    }

    pub fn len(&self) -> StoreResult<usize> {
        let guard = self
            .catalogue
            .read()
            .map_err(|_| StoreError::Backend("definition catalogue lock poisoned".to_string()))?;
        Ok(guard.len())
    }
}

impl DefinitionStore for InMemoryDefinitionStore {
    fn snapshot(&self) -> StoreResult<Arc<dyn DefinitionLookup>> {
        let guard = self
            .catalogue
            .read()
            .map_err(|_| StoreError::Backend("definition catalogue lock poisoned".to_string()))?;
        let snapshot: Arc<dyn DefinitionLookup> = guard.clone();
        Ok(snapshot)
    }
}
