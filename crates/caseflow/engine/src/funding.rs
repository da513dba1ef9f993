//! Funding stage: pledges summed against a target
//!
//! Pledges are never deduplicated; a household may pledge as often as it
//! likes. The target is informational. Closing never waits for it.

use crate::lifecycle::{advance, ensure_stage};
use crate::repository::CaseRepository;
use caseflow_types::{Actor, Amount, Case, CaseId, CaseResult, CaseStatus, Pledge};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Sum of every pledge, regardless of target.
pub fn total_pledged(case: &Case) -> Amount {
    case.funding.pledges.iter().map(|pledge| &pledge.amount).sum()
}

/// Progress of the funding stage against its target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingSummary {
    pub target: Amount,
    pub total: Amount,
    pub remaining: Amount,
    pub target_met: bool,
}

pub fn summarize_funding(case: &Case) -> FundingSummary {
    let target = case.funding.target_amount;
    let total = total_pledged(case);
    FundingSummary {
        target,
        total,
        remaining: target.saturating_sub(total),
        target_met: total >= target,
    }
}

#[derive(Clone)]
pub struct FundingEngine {
    repo: CaseRepository,
}

impl FundingEngine {
    pub fn new(repo: CaseRepository) -> Self {
        Self { repo }
    }

    /// Append a pledge.
    pub async fn add_pledge(
        &self,
        case_id: &CaseId,
        actor: &Actor,
        amount: Amount,
    ) -> CaseResult<Case> {
        let case = self
            .repo
            .mutate(case_id, |case, now| {
                ensure_stage(case, CaseStatus::Funding, "pledge to")?;
                case.funding.pledges.push(Pledge {
                    user_id: actor.user_id.clone(),
                    household_id: actor.household_id.clone(),
                    amount,
                    at: now,
                });
                Ok(())
            })
            .await?;

        debug!(
            case_id = %case_id,
            household = %actor.household_id,
            amount = %amount,
            total = %total_pledged(&case),
            "Pledge recorded"
        );
        Ok(case)
    }

    /// Close funding and move to execution, met target or not.
    pub async fn close_funding(&self, case_id: &CaseId) -> CaseResult<Case> {
        self.repo
            .mutate(case_id, |case, now| {
                ensure_stage(case, CaseStatus::Funding, "close funding of")?;
                let summary = summarize_funding(case);
                info!(
                    case_id = %case.id,
                    total = %summary.total,
                    target = %summary.target,
                    target_met = summary.target_met,
                    "Funding closed"
                );
                case.funding.closed_at = Some(now);
                advance(case, CaseStatus::Execution, "close funding of")
            })
            .await
    }
}
