use crate::{ChangeSet, StoreResult};
use case_types::{ContainerRef, Definition, DefinitionId, Instance, InstanceId, PlanItem, PlanItemId, TenantId};
use std::sync::Arc;

/// Read access to a consistent view of the definition catalogue.
pub trait DefinitionLookup: Send + Sync {
    /// Get one definition by id.
    fn find_by_id(&self, id: &DefinitionId) -> StoreResult<Option<Definition>>;

    /// Highest version with this key and no tenant.
    fn find_latest_by_key(&self, key: &str) -> StoreResult<Option<Definition>>;

    /// Highest version with this key owned by `tenant_id`.
    fn find_latest_by_key_and_tenant(
        &self,
        key: &str,
        tenant_id: &TenantId,
    ) -> StoreResult<Option<Definition>>;
}

/// Source of definition snapshots.
///
/// A snapshot never observes deployments made after it was taken.
pub trait DefinitionStore: Send + Sync {
    fn snapshot(&self) -> StoreResult<Arc<dyn DefinitionLookup>>;
}

/// Storage interface for instances and their plan items.
pub trait InstanceStore: Send + Sync {
    /// Allocate a fresh instance id.
    fn next_instance_id(&self) -> StoreResult<InstanceId>;

    /// Allocate a fresh plan item id.
    fn next_plan_item_id(&self) -> StoreResult<PlanItemId>;

    fn get_instance(&self, id: &InstanceId) -> StoreResult<Option<Instance>>;

    fn get_plan_item(&self, id: &PlanItemId) -> StoreResult<Option<PlanItem>>;

    /// Direct children of a container, oldest first.
    fn children(&self, container: &ContainerRef) -> StoreResult<Vec<PlanItem>>;

    /// Apply a change set atomically.
    ///
    /// Either every change is applied or none is. Fails with
    /// `PreconditionFailed` when a guard does not hold, `Conflict` when an
    /// insert reuses an existing id and `NotFound` when an update targets a
    /// missing record.
    fn apply(&self, changes: ChangeSet) -> StoreResult<()>;
}
