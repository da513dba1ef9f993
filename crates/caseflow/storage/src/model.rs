use caseflow_types::{CaseId, CaseStatus, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Override append payload. Hashes and sequencing are assigned by storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideAppend {
    pub timestamp: DateTime<Utc>,
    pub case_id: CaseId,
    pub from: CaseStatus,
    pub to: CaseStatus,
    pub operator: UserId,
    pub reason: String,
}

/// Persistent tamper-evident record of a privileged status override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRecord {
    pub event_id: String,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub case_id: CaseId,
    pub from: CaseStatus,
    pub to: CaseStatus,
    pub operator: UserId,
    pub reason: String,
    pub previous_hash: Option<String>,
    pub hash: String,
}
