//! Case repository: the engine's only path to storage
//!
//! Holds no state of its own. Writes are compare-and-set on the case
//! version; `CaseRepository::mutate` re-reads and re-applies the change
//! when another writer got there first.

use crate::clock::Clock;
use caseflow_storage::{CaseStorage, OverrideAppend, OverrideRecord, StorageError};
use caseflow_types::{
    Case, CaseError, CaseFilter, CaseId, CaseResult, CaseStatus, HouseholdId, NewCase,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Case persistence facade shared by every stage engine.
#[derive(Clone)]
pub struct CaseRepository {
    storage: Arc<dyn CaseStorage>,
    clock: Arc<dyn Clock>,
    max_conflict_retries: u32,
}

impl CaseRepository {
    pub fn new(storage: Arc<dyn CaseStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            max_conflict_retries: 3,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub(crate) fn storage(&self) -> Arc<dyn CaseStorage> {
        Arc::clone(&self.storage)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create a draft case with empty stage records.
    pub async fn create(&self, input: NewCase) -> CaseResult<Case> {
        let case = Case::new(input, self.clock.now())?;
        self.storage.insert_case(case.clone()).await?;
        info!(case_id = %case.id, title = %case.title, "Case created");
        Ok(case)
    }

    pub async fn get(&self, case_id: &CaseId) -> CaseResult<Option<Case>> {
        Ok(self.storage.get_case(case_id).await?)
    }

    /// Like [`get`](Self::get), but a missing case is `NotFound`.
    pub async fn require(&self, case_id: &CaseId) -> CaseResult<Case> {
        self.get(case_id)
            .await?
            .ok_or_else(|| CaseError::NotFound(case_id.clone()))
    }

    /// Cases matching `filter`, most recently updated first.
    pub async fn list(&self, filter: CaseFilter) -> CaseResult<Vec<Case>> {
        let mut cases: Vec<Case> = self
            .storage
            .list_cases()
            .await?
            .into_iter()
            .filter(|case| filter.matches(case.status))
            .collect();
        cases.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(cases)
    }

    /// Cases currently in voting that the household may take part in.
    pub async fn visible_to(&self, household: &HouseholdId) -> CaseResult<Vec<Case>> {
        Ok(self
            .list(CaseFilter::Active)
            .await?
            .into_iter()
            .filter(|case| case.status == CaseStatus::Voting && case.is_open_to(household))
            .collect())
    }

    /// Upsert a whole case snapshot, refreshing `updated_at`.
    ///
    /// An existing case is replaced only if the snapshot's version is
    /// still current; otherwise the write fails with `Conflict`. Status is
    /// not editable here: a new snapshot must be a draft, an existing one
    /// must keep its stored status, and terminal cases are read-only.
    pub async fn save(&self, mut case: Case) -> CaseResult<Case> {
        case.updated_at = self.clock.now();
        let Some(stored) = self.storage.get_case(&case.id).await? else {
            if case.status != CaseStatus::Draft {
                return Err(CaseError::invalid_transition(&case.id, case.status, "import"));
            }
            self.storage.insert_case(case.clone()).await?;
            return Ok(case);
        };

        if stored.status.is_terminal() || stored.status != case.status {
            return Err(CaseError::invalid_transition(&case.id, stored.status, "save"));
        }

        let expected = case.version;
        let case_id = case.id.clone();
        self.storage
            .put_case(case, expected)
            .await
            .map_err(|err| match err {
                StorageError::Conflict(_) => CaseError::Conflict(case_id),
                other => other.into(),
            })
    }

    /// Delete a case. Unknown ids are `NotFound`.
    pub async fn delete(&self, case_id: &CaseId) -> CaseResult<()> {
        if self.storage.delete_case(case_id).await? {
            info!(case_id = %case_id, "Case deleted");
            Ok(())
        } else {
            Err(CaseError::NotFound(case_id.clone()))
        }
    }

    /// Load → apply → compare-and-set write.
    ///
    /// `apply` receives the current case and the operation timestamp. If
    /// it fails nothing is written. On a version conflict the case is
    /// re-read and `apply` runs again, up to the configured retry count.
    pub(crate) async fn mutate<F>(&self, case_id: &CaseId, mut apply: F) -> CaseResult<Case>
    where
        F: FnMut(&mut Case, DateTime<Utc>) -> CaseResult<()> + Send,
    {
        let mut attempt = 0u32;
        loop {
            let mut case = self.require(case_id).await?;
            let expected = case.version;
            let now = self.clock.now();

            apply(&mut case, now)?;
            case.updated_at = now;

            match self.storage.put_case(case, expected).await {
                Ok(stored) => {
                    debug!(case_id = %case_id, version = stored.version, "Case saved");
                    return Ok(stored);
                }
                Err(err) => self.retry_or_fail(case_id, err, &mut attempt)?,
            }
        }
    }

    /// Like [`mutate`](Self::mutate), but `apply` also yields an override
    /// event that is stored in the same write as the case.
    pub(crate) async fn mutate_with_override<F>(
        &self,
        case_id: &CaseId,
        mut apply: F,
    ) -> CaseResult<(Case, OverrideRecord)>
    where
        F: FnMut(&mut Case, DateTime<Utc>) -> CaseResult<OverrideAppend> + Send,
    {
        let mut attempt = 0u32;
        loop {
            let mut case = self.require(case_id).await?;
            let expected = case.version;
            let now = self.clock.now();

            let event = apply(&mut case, now)?;
            case.updated_at = now;

            match self
                .storage
                .put_case_with_override(case, expected, event)
                .await
            {
                Ok((stored, record)) => {
                    debug!(
                        case_id = %case_id,
                        version = stored.version,
                        sequence = record.sequence,
                        "Case saved with override record"
                    );
                    return Ok((stored, record));
                }
                Err(err) => self.retry_or_fail(case_id, err, &mut attempt)?,
            }
        }
    }

    /// `Ok` means try again; conflicts past the budget and other storage
    /// errors end the write.
    fn retry_or_fail(
        &self,
        case_id: &CaseId,
        err: StorageError,
        attempt: &mut u32,
    ) -> CaseResult<()> {
        match err {
            StorageError::Conflict(detail) if *attempt < self.max_conflict_retries => {
                *attempt += 1;
                warn!(case_id = %case_id, attempt = *attempt, detail = %detail, "Write conflict, retrying");
                Ok(())
            }
            StorageError::Conflict(_) => {
                warn!(case_id = %case_id, "Write conflict, retries exhausted");
                Err(CaseError::Conflict(case_id.clone()))
            }
            other => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use async_trait::async_trait;
    use caseflow_storage::memory::InMemoryCaseStorage;
    use caseflow_storage::{CaseStore, OverrideAuditStore, StorageResult};
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
    }

    fn repo() -> (CaseRepository, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(start()));
        let repo = CaseRepository::new(Arc::new(InMemoryCaseStorage::new()), clock.clone());
        (repo, clock)
    }

    /// Storage that lets a phantom writer win the first `races` writes.
    struct RacingStorage {
        inner: InMemoryCaseStorage,
        races: AtomicU32,
    }

    #[async_trait]
    impl CaseStore for RacingStorage {
        async fn get_case(&self, case_id: &CaseId) -> StorageResult<Option<Case>> {
            self.inner.get_case(case_id).await
        }

        async fn insert_case(&self, case: Case) -> StorageResult<()> {
            self.inner.insert_case(case).await
        }

        async fn put_case(&self, case: Case, expected_version: u64) -> StorageResult<Case> {
            if self.races.load(Ordering::SeqCst) > 0 {
                self.races.fetch_sub(1, Ordering::SeqCst);
                let mut theirs = case.clone();
                theirs.text = "edited concurrently".to_string();
                self.inner.put_case(theirs, expected_version).await?;
            }
            self.inner.put_case(case, expected_version).await
        }

        async fn list_cases(&self) -> StorageResult<Vec<Case>> {
            self.inner.list_cases().await
        }

        async fn delete_case(&self, case_id: &CaseId) -> StorageResult<bool> {
            self.inner.delete_case(case_id).await
        }
    }

    #[async_trait]
    impl OverrideAuditStore for RacingStorage {
        async fn append_override(&self, event: OverrideAppend) -> StorageResult<OverrideRecord> {
            self.inner.append_override(event).await
        }

        async fn list_overrides(&self, case_id: &CaseId) -> StorageResult<Vec<OverrideRecord>> {
            self.inner.list_overrides(case_id).await
        }

    }

    #[async_trait]
    impl CaseStorage for RacingStorage {
        async fn put_case_with_override(
            &self,
            case: Case,
            expected_version: u64,
            event: OverrideAppend,
        ) -> StorageResult<(Case, OverrideRecord)> {
            self.inner
                .put_case_with_override(case, expected_version, event)
                .await
        }
    }

    fn racing_repo(races: u32, retries: u32) -> CaseRepository {
        let storage = RacingStorage {
            inner: InMemoryCaseStorage::new(),
            races: AtomicU32::new(races),
        };
        CaseRepository::new(Arc::new(storage), Arc::new(FixedClock::new(start())))
            .with_max_conflict_retries(retries)
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let (repo, _) = repo();
        let case = repo.create(NewCase::new("Snow clearing")).await.unwrap();
        assert_eq!(case.status, CaseStatus::Draft);
        assert_eq!(case.created_at, start());
        assert_eq!(repo.require(&case.id).await.unwrap(), case);
    }

    #[tokio::test]
    async fn create_rejects_empty_title() {
        let (repo, _) = repo();
        let err = repo.create(NewCase::new("")).await.unwrap_err();
        assert!(matches!(err, CaseError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_case_is_not_found() {
        let (repo, _) = repo();
        let id = CaseId::new("nope");
        assert!(repo.get(&id).await.unwrap().is_none());
        assert!(matches!(
            repo.require(&id).await,
            Err(CaseError::NotFound(_))
        ));
        assert!(matches!(repo.delete(&id).await, Err(CaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_orders_by_updated_at_and_filters() {
        let (repo, clock) = repo();
        let older = repo.create(NewCase::new("Older")).await.unwrap();
        clock.advance(Duration::minutes(1));
        let newer = repo.create(NewCase::new("Newer")).await.unwrap();
        clock.advance(Duration::minutes(1));
        let rejected = repo
            .mutate(&older.id, |case, _| {
                case.status = CaseStatus::Rejected;
                Ok(())
            })
            .await
            .unwrap();

        let all = repo.list(CaseFilter::All).await.unwrap();
        let ids: Vec<&CaseId> = all.iter().map(|c| &c.id).collect();
        assert_eq!(ids, vec![&rejected.id, &newer.id]);

        let active = repo.list(CaseFilter::Active).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, newer.id);

        let archived = repo.list(CaseFilter::Archived).await.unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].id, older.id);
    }

    #[tokio::test]
    async fn save_upserts_and_refreshes_updated_at() {
        let (repo, clock) = repo();
        let case = Case::new(NewCase::new("Imported"), start()).unwrap();

        clock.advance(Duration::hours(1));
        let inserted = repo.save(case).await.unwrap();
        assert_eq!(inserted.updated_at, start() + Duration::hours(1));

        let mut edited = inserted.clone();
        edited.text = "details".to_string();
        clock.advance(Duration::hours(1));
        let saved = repo.save(edited).await.unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(saved.updated_at, start() + Duration::hours(2));

        // The first snapshot is now stale.
        assert!(matches!(
            repo.save(inserted).await,
            Err(CaseError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn save_cannot_change_status() {
        let (repo, _) = repo();
        let case = repo.create(NewCase::new("Bypass")).await.unwrap();

        let mut promoted = case.clone();
        promoted.status = CaseStatus::Tender;
        assert!(matches!(
            repo.save(promoted).await,
            Err(CaseError::InvalidTransition { status: CaseStatus::Draft, .. })
        ));

        let mut imported = Case::new(NewCase::new("Imported"), start()).unwrap();
        imported.status = CaseStatus::Archived;
        assert!(matches!(
            repo.save(imported.clone()).await,
            Err(CaseError::InvalidTransition { .. })
        ));
        assert!(repo.get(&imported.id).await.unwrap().is_none());
        assert_eq!(repo.require(&case.id).await.unwrap().status, CaseStatus::Draft);
    }

    #[tokio::test]
    async fn save_refuses_terminal_cases() {
        let (repo, _) = repo();
        let case = repo.create(NewCase::new("Closed")).await.unwrap();
        let rejected = repo
            .mutate(&case.id, |case, _| {
                case.status = CaseStatus::Rejected;
                Ok(())
            })
            .await
            .unwrap();

        let mut edited = rejected.clone();
        edited.title = "rewritten".to_string();
        assert!(matches!(
            repo.save(edited).await,
            Err(CaseError::InvalidTransition { status: CaseStatus::Rejected, .. })
        ));
        assert_eq!(repo.require(&case.id).await.unwrap().title, "Closed");
    }

    #[tokio::test]
    async fn failed_mutation_writes_nothing() {
        let (repo, _) = repo();
        let case = repo.create(NewCase::new("Unchanged")).await.unwrap();

        let err = repo
            .mutate(&case.id, |case, _| {
                case.title = "half-applied".to_string();
                Err(CaseError::Validation("boom".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CaseError::Validation(_)));
        let stored = repo.require(&case.id).await.unwrap();
        assert_eq!(stored.title, "Unchanged");
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn mutate_retries_after_conflict_and_keeps_both_writes() {
        let repo = racing_repo(1, 3);
        let case = repo.create(NewCase::new("Contended")).await.unwrap();

        let mut applied = 0;
        let stored = repo
            .mutate(&case.id, |case, _| {
                applied += 1;
                case.title = "Renamed".to_string();
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(applied, 2);
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.text, "edited concurrently");
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn mutate_gives_up_after_retry_budget() {
        let repo = racing_repo(5, 1);
        let case = repo.create(NewCase::new("Hot")).await.unwrap();

        let err = repo
            .mutate(&case.id, |_, _| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn visible_to_respects_participants() {
        let (repo, _) = repo();
        let open = repo.create(NewCase::new("Open")).await.unwrap();
        let closed = repo
            .create(NewCase::new("Street only").with_participant("h1"))
            .await
            .unwrap();
        let draft = repo.create(NewCase::new("Still drafting")).await.unwrap();
        for id in [&open.id, &closed.id] {
            repo.mutate(id, |case, _| {
                case.status = CaseStatus::Voting;
                Ok(())
            })
            .await
            .unwrap();
        }

        let for_h1 = repo.visible_to(&HouseholdId::new("h1")).await.unwrap();
        assert_eq!(for_h1.len(), 2);

        let for_h9 = repo.visible_to(&HouseholdId::new("h9")).await.unwrap();
        assert_eq!(for_h9.len(), 1);
        assert_eq!(for_h9[0].id, open.id);
        assert!(for_h9.iter().all(|c| c.id != draft.id));
    }
}
