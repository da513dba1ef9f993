//! Lifecycle controller: status guards and the audited override
//!
//! Stage engines call [`ensure_stage`] before touching a sub-record and
//! [`advance`] to move the status along a legal edge. The only other way
//! to change a status is [`LifecycleController::override_status`], a
//! privileged path that records who did it and why.

use crate::repository::CaseRepository;
use caseflow_storage::{OverrideAppend, OverrideRecord};
use caseflow_types::{Case, CaseError, CaseId, CaseResult, CaseStatus, UserId};
use tracing::{info, warn};

/// Fail with `InvalidTransition` unless the case is in `expected`.
pub fn ensure_stage(case: &Case, expected: CaseStatus, operation: &'static str) -> CaseResult<()> {
    if case.status == expected {
        Ok(())
    } else {
        Err(CaseError::invalid_transition(&case.id, case.status, operation))
    }
}

/// Move the case along a legal forward edge.
pub fn advance(case: &mut Case, target: CaseStatus, operation: &'static str) -> CaseResult<()> {
    if !case.status.can_advance_to(target) {
        return Err(CaseError::invalid_transition(&case.id, case.status, operation));
    }
    info!(case_id = %case.id, from = %case.status, to = %target, "Case status advanced");
    case.status = target;
    Ok(())
}

/// Owner of the privileged status override.
#[derive(Clone)]
pub struct LifecycleController {
    repo: CaseRepository,
    allow_terminal_override: bool,
}

impl LifecycleController {
    pub fn new(repo: CaseRepository) -> Self {
        Self {
            repo,
            allow_terminal_override: false,
        }
    }

    pub fn with_terminal_override(mut self, allowed: bool) -> Self {
        self.allow_terminal_override = allowed;
        self
    }

    /// Force a case into `target`, bypassing stage rules.
    ///
    /// Requires a reason. Leaving `archived` or `rejected` is refused
    /// unless terminal overrides are enabled. The status change and its
    /// audit record are committed in one storage write.
    pub async fn override_status(
        &self,
        case_id: &CaseId,
        target: CaseStatus,
        operator: &UserId,
        reason: &str,
    ) -> CaseResult<(Case, OverrideRecord)> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CaseError::Validation(
                "a status override needs a reason".into(),
            ));
        }

        let allow_terminal = self.allow_terminal_override;
        let (case, record) = self
            .repo
            .mutate_with_override(case_id, |case, now| {
                if case.status == target {
                    return Err(CaseError::Validation(format!(
                        "case is already {target}"
                    )));
                }
                if case.status.is_terminal() && !allow_terminal {
                    return Err(CaseError::invalid_transition(
                        &case.id,
                        case.status,
                        "override the status of",
                    ));
                }
                let event = OverrideAppend {
                    timestamp: now,
                    case_id: case.id.clone(),
                    from: case.status,
                    to: target,
                    operator: operator.clone(),
                    reason: reason.to_string(),
                };
                case.status = target;
                Ok(event)
            })
            .await?;

        warn!(
            case_id = %case_id,
            from = %record.from,
            to = %target,
            operator = %operator,
            reason,
            sequence = record.sequence,
            "Case status overridden"
        );

        Ok((case, record))
    }

    /// Overrides applied to a case, oldest first.
    pub async fn override_history(&self, case_id: &CaseId) -> CaseResult<Vec<OverrideRecord>> {
        Ok(self.repo.storage().list_overrides(case_id).await?)
    }
}
