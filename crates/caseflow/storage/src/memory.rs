//! In-memory reference implementation of the case storage traits.
//!
//! This adapter is deterministic and test-friendly. Production deployments
//! should use a transactional backend keyed by case id.

use crate::model::{OverrideAppend, OverrideRecord};
use crate::traits::{CaseStorage, CaseStore, OverrideAuditStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use caseflow_types::{Case, CaseId};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory case storage adapter.
#[derive(Default)]
pub struct InMemoryCaseStorage {
    cases: RwLock<HashMap<CaseId, Case>>,
    overrides: RwLock<Vec<OverrideRecord>>,
}

impl InMemoryCaseStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStorage {
    async fn get_case(&self, case_id: &CaseId) -> StorageResult<Option<Case>> {
        let guard = self
            .cases
            .read()
            .map_err(|_| StorageError::Backend("cases lock poisoned".to_string()))?;
        Ok(guard.get(case_id).cloned())
    }

    async fn insert_case(&self, case: Case) -> StorageResult<()> {
        let mut guard = self
            .cases
            .write()
            .map_err(|_| StorageError::Backend("cases lock poisoned".to_string()))?;

        if guard.contains_key(&case.id) {
            return Err(StorageError::Conflict(format!(
                "case {} already exists",
                case.id
            )));
        }
        guard.insert(case.id.clone(), case);
        Ok(())
    }

    async fn put_case(&self, mut case: Case, expected_version: u64) -> StorageResult<Case> {
        let mut guard = self
            .cases
            .write()
            .map_err(|_| StorageError::Backend("cases lock poisoned".to_string()))?;
        check_version(&guard, &case, expected_version)?;

        case.version = expected_version + 1;
        guard.insert(case.id.clone(), case.clone());
        Ok(case)
    }

    async fn list_cases(&self) -> StorageResult<Vec<Case>> {
        let guard = self
            .cases
            .read()
            .map_err(|_| StorageError::Backend("cases lock poisoned".to_string()))?;
        Ok(guard.values().cloned().collect())
    }

    async fn delete_case(&self, case_id: &CaseId) -> StorageResult<bool> {
        let mut guard = self
            .cases
            .write()
            .map_err(|_| StorageError::Backend("cases lock poisoned".to_string()))?;
        Ok(guard.remove(case_id).is_some())
    }
}

#[async_trait]
impl OverrideAuditStore for InMemoryCaseStorage {
    async fn append_override(&self, event: OverrideAppend) -> StorageResult<OverrideRecord> {
        let mut guard = self
            .overrides
            .write()
            .map_err(|_| StorageError::Backend("override lock poisoned".to_string()))?;

        let record = next_override_record(&guard, event)?;
        guard.push(record.clone());
        Ok(record)
    }

    async fn list_overrides(&self, case_id: &CaseId) -> StorageResult<Vec<OverrideRecord>> {
        let guard = self
            .overrides
            .read()
            .map_err(|_| StorageError::Backend("override lock poisoned".to_string()))?;
        Ok(guard
            .iter()
            .filter(|record| &record.case_id == case_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CaseStorage for InMemoryCaseStorage {
    async fn put_case_with_override(
        &self,
        mut case: Case,
        expected_version: u64,
        event: OverrideAppend,
    ) -> StorageResult<(Case, OverrideRecord)> {
        // Lock order: cases, then overrides.
        let mut cases = self
            .cases
            .write()
            .map_err(|_| StorageError::Backend("cases lock poisoned".to_string()))?;
        let mut overrides = self
            .overrides
            .write()
            .map_err(|_| StorageError::Backend("override lock poisoned".to_string()))?;

        check_version(&cases, &case, expected_version)?;
        let record = next_override_record(&overrides, event)?;

        case.version = expected_version + 1;
        cases.insert(case.id.clone(), case.clone());
        overrides.push(record.clone());
        Ok((case, record))
    }
}

fn check_version(
    cases: &HashMap<CaseId, Case>,
    case: &Case,
    expected_version: u64,
) -> StorageResult<()> {
    let stored = cases
        .get(&case.id)
        .ok_or_else(|| StorageError::NotFound(format!("case {} not found", case.id)))?;

    if stored.version != expected_version {
        return Err(StorageError::Conflict(format!(
            "case {}: expected version {}, found {}",
            case.id, expected_version, stored.version
        )));
    }
    Ok(())
}

fn next_override_record(
    chain: &[OverrideRecord],
    event: OverrideAppend,
) -> StorageResult<OverrideRecord> {
    let previous_hash = chain.last().map(|e| e.hash.clone());
    let sequence = chain.len() as u64 + 1;
    let hash = compute_override_hash(&event, previous_hash.as_deref(), sequence)?;

    Ok(OverrideRecord {
        event_id: format!("override-{}", Uuid::new_v4()),
        sequence,
        timestamp: event.timestamp,
        case_id: event.case_id,
        from: event.from,
        to: event.to,
        operator: event.operator,
        reason: event.reason,
        previous_hash,
        hash,
    })
}

fn compute_override_hash(
    event: &OverrideAppend,
    previous_hash: Option<&str>,
    sequence: u64,
) -> StorageResult<String> {
    let serializable = serde_json::json!({
        "previous_hash": previous_hash,
        "sequence": sequence,
        "timestamp": event.timestamp,
        "case_id": event.case_id.0,
        "from": event.from,
        "to": event.to,
        "operator": event.operator.0,
        "reason": event.reason,
    });
    let serialized = serde_json::to_vec(&serializable)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(blake3::hash(&serialized).to_hex().to_string())
}
