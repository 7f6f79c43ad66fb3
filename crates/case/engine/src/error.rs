use case_store::{Precondition, StoreError};
use case_types::{DefinitionId, InstanceId, PlanItemId, TenantId};
use thiserror::Error;

/// Result type for engine operations.
pub type CaseResult<T> = Result<T, CaseError>;

/// The lookup that produced no result, with the parameters attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    DefinitionId(DefinitionId),
    DefinitionKey(String),
    DefinitionKeyAndTenant { key: String, tenant_id: TenantId },
    /// Tenant lookup failed and the no-tenant fallback failed too
    DefinitionKeyWithFallback(String),
    Instance(InstanceId),
    PlanItem(PlanItemId),
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookup::DefinitionId(id) => write!(f, "No definition found for id = '{}'", id),
            Lookup::DefinitionKey(key) => write!(f, "No definition found for key '{}'", key),
            Lookup::DefinitionKeyAndTenant { key, tenant_id } => write!(
                f,
                "Definition with key '{}' and tenantId '{}' was not found",
                key, tenant_id
            ),
            Lookup::DefinitionKeyWithFallback(key) => write!(
                f,
                "No definition found for key '{}'. Fallback to default tenant was also applied.",
                key
            ),
            Lookup::Instance(id) => write!(f, "No instance found for id '{}'", id),
            Lookup::PlanItem(id) => write!(f, "No plan item found for id '{}'", id),
        }
    }
}

/// Coarse classification callers map to their own presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    IllegalState,
    Store,
    Activation,
}

/// Errors raised by engine commands.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaseError {
    /// Insufficient or contradictory input. Raised before any mutation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(Lookup),

    /// The target exists but is not in a state that allows the operation
    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The execution interpreter refused to activate an instance or plan item
    #[error("activation failed: {0}")]
    Activation(String),
}

impl CaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaseError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CaseError::NotFound(_) => ErrorKind::NotFound,
            CaseError::IllegalState(_) => ErrorKind::IllegalState,
            CaseError::Store(_) => ErrorKind::Store,
            CaseError::Activation(_) => ErrorKind::Activation,
        }
    }

    /// Whether retrying the whole command from scratch may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CaseError::Store(e) if e.is_transient())
    }

    /// Classify a failure raised while applying a change set.
    ///
    /// A container that stopped being active between execution and commit
    /// is an illegal state, not a storage fault.
    pub(crate) fn from_commit(err: StoreError) -> Self {
        match err {
            StoreError::PreconditionFailed(Precondition::ContainerActive(container)) => {
                CaseError::IllegalState(format!("{} is no longer active", container))
            }
            other => CaseError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_types::ContainerRef;

    #[test]
    fn not_found_messages_carry_lookup_parameters() {
        let err = CaseError::NotFound(Lookup::DefinitionKeyAndTenant {
            key: "order".into(),
            tenant_id: TenantId::new("t2"),
        });
        assert_eq!(
            err.to_string(),
            "Definition with key 'order' and tenantId 't2' was not found"
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = CaseError::NotFound(Lookup::DefinitionKeyWithFallback("order".into()));
        assert!(err.to_string().contains("Fallback to default tenant was also applied"));
    }

    #[test]
    fn commit_time_container_failure_is_illegal_state() {
        let err = CaseError::from_commit(StoreError::PreconditionFailed(
            Precondition::ContainerActive(ContainerRef::Stage(PlanItemId::new("s-1"))),
        ));
        assert_eq!(err.kind(), ErrorKind::IllegalState);

        let err = CaseError::from_commit(StoreError::Conflict("instance i-1 already exists".into()));
        assert_eq!(err.kind(), ErrorKind::Store);
    }

    #[test]
    fn only_transient_store_errors_are_transient() {
        assert!(CaseError::Store(StoreError::Transient("deadlock".into())).is_transient());
        assert!(!CaseError::Store(StoreError::Backend("down".into())).is_transient());
        assert!(!CaseError::IllegalState("terminated".into()).is_transient());

        let stale = CaseError::from_commit(StoreError::Stale("stage s-1 is at revision 3".into()));
        assert_eq!(stale.kind(), ErrorKind::Store);
        assert!(stale.is_transient());
    }
}
