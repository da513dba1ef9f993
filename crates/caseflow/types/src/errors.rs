//! Error types for case operations

use crate::{CaseId, CaseStatus, HouseholdId, ProposalId};

/// Errors that can occur in case operations.
///
/// All of them are local and recoverable by the caller.
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("Case not found: {0}")]
    NotFound(CaseId),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("Invalid transition: cannot {operation} case {case_id} in status {status}")]
    InvalidTransition {
        case_id: CaseId,
        status: CaseStatus,
        operation: &'static str,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Household {household} has already cast a ballot")]
    DuplicateBallot { household: HouseholdId },

    #[error("Concurrent modification of case {0}; retries exhausted")]
    Conflict(CaseId),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CaseError {
    pub fn invalid_transition(
        case_id: &CaseId,
        status: CaseStatus,
        operation: &'static str,
    ) -> Self {
        CaseError::InvalidTransition {
            case_id: case_id.clone(),
            status,
            operation,
        }
    }
}

/// Result type alias for case operations
pub type CaseResult<T> = Result<T, CaseError>;
