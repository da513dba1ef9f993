use crate::model::{OverrideAppend, OverrideRecord};
use crate::StorageResult;
use async_trait::async_trait;
use caseflow_types::{Case, CaseId};

/// Storage interface for case documents.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Get one case by id.
    async fn get_case(&self, case_id: &CaseId) -> StorageResult<Option<Case>>;

    /// Insert a newly created case. Fails with `Conflict` if the id exists.
    async fn insert_case(&self, case: Case) -> StorageResult<()>;

    /// Replace a case if the stored version still equals `expected_version`.
    ///
    /// On success the stored copy carries `expected_version + 1` and is
    /// returned. A stale version yields `Conflict`; a missing case yields
    /// `NotFound`.
    async fn put_case(&self, case: Case, expected_version: u64) -> StorageResult<Case>;

    /// All stored cases, in no particular order.
    async fn list_cases(&self) -> StorageResult<Vec<Case>>;

    /// Remove a case. Returns whether anything was removed.
    async fn delete_case(&self, case_id: &CaseId) -> StorageResult<bool>;
}

/// Storage interface for the append-only override audit chain.
#[async_trait]
pub trait OverrideAuditStore: Send + Sync {
    /// Append an override and return the canonical, hash-linked stored record.
    async fn append_override(&self, event: OverrideAppend) -> StorageResult<OverrideRecord>;

    /// Overrides applied to one case, oldest first.
    async fn list_overrides(&self, case_id: &CaseId) -> StorageResult<Vec<OverrideRecord>>;
}

/// Storage bundle used by the case engine.
#[async_trait]
pub trait CaseStorage: CaseStore + OverrideAuditStore + Send + Sync {
    /// Compare-and-set a case and append its override record as one unit.
    ///
    /// Either both are stored or neither is. Version semantics match
    /// [`CaseStore::put_case`]; the record is chained like
    /// [`OverrideAuditStore::append_override`].
    async fn put_case_with_override(
        &self,
        case: Case,
        expected_version: u64,
        event: OverrideAppend,
    ) -> StorageResult<(Case, OverrideRecord)>;
}
