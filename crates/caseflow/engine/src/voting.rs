//! Voting stage: per-household yes/no/abstain ballots
//!
//! A household may change its mind until the stage closes; only its
//! latest ballot counts (under the default overwrite policy). Closing
//! applies the configured decision rule to the cast ballots: approval
//! moves the case to tender, anything else rejects it.

use crate::lifecycle::{advance, ensure_stage};
use crate::repository::CaseRepository;
use crate::tally::{
    upsert_by_household, BallotTally, Decision, DecisionRule, DuplicatePolicy, StrictMajority,
};
use caseflow_types::{
    Actor, Case, CaseError, CaseFilter, CaseId, CaseResult, CaseStatus, InitiatorOpinion, Vote,
    VoteChoice,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counted ballots for a case
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingSummary {
    pub yes: usize,
    pub no: usize,
    pub abstain: usize,
    /// Length of the vote list.
    pub total: usize,
    /// Size of the participant set.
    pub total_eligible: usize,
    pub initiator_yes: usize,
    pub initiator_no: usize,
}

impl VotingSummary {
    pub fn tally(&self) -> BallotTally {
        BallotTally {
            yes: self.yes,
            no: self.no,
            abstain: self.abstain,
        }
    }
}

pub fn summarize_voting(case: &Case) -> VotingSummary {
    let votes = &case.voting.votes;
    let tally = BallotTally::count(votes.iter().map(|v| &v.choice));
    let initiator_yes = votes
        .iter()
        .filter(|v| v.initiator_opinion == InitiatorOpinion::Yes)
        .count();

    VotingSummary {
        yes: tally.yes,
        no: tally.no,
        abstain: tally.abstain,
        total: votes.len(),
        total_eligible: case.participants.len(),
        initiator_yes,
        initiator_no: votes.len() - initiator_yes,
    }
}

#[derive(Clone)]
pub struct VotingEngine {
    repo: CaseRepository,
    duplicate_policy: DuplicatePolicy,
    rule: Arc<dyn DecisionRule>,
}

impl VotingEngine {
    pub fn new(repo: CaseRepository) -> Self {
        Self {
            repo,
            duplicate_policy: DuplicatePolicy::Overwrite,
            rule: Arc::new(StrictMajority),
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_rule(mut self, rule: Arc<dyn DecisionRule>) -> Self {
        self.rule = rule;
        self
    }

    /// Open a draft case for voting, optionally with a closing deadline.
    pub async fn start_voting(
        &self,
        case_id: &CaseId,
        deadline: Option<DateTime<Utc>>,
    ) -> CaseResult<Case> {
        self.repo
            .mutate(case_id, |case, now| {
                ensure_stage(case, CaseStatus::Draft, "start voting on")?;
                if let Some(deadline) = deadline {
                    if deadline <= now {
                        return Err(CaseError::Validation(
                            "voting deadline must be in the future".into(),
                        ));
                    }
                }
                case.voting.start_at = Some(now);
                case.voting.end_at = None;
                case.voting.deadline = deadline;
                advance(case, CaseStatus::Voting, "start voting on")
            })
            .await
    }

    /// Record or replace a household's ballot.
    pub async fn record_vote(
        &self,
        case_id: &CaseId,
        actor: &Actor,
        choice: VoteChoice,
        initiator_opinion: InitiatorOpinion,
    ) -> CaseResult<Case> {
        let policy = self.duplicate_policy;
        let case = self
            .repo
            .mutate(case_id, |case, now| {
                ensure_stage(case, CaseStatus::Voting, "record a vote on")?;
                let vote = Vote {
                    user_id: actor.user_id.clone(),
                    household_id: actor.household_id.clone(),
                    choice,
                    initiator_opinion,
                    at: now,
                };
                upsert_by_household(&mut case.voting.votes, vote, policy)?;
                Ok(())
            })
            .await?;

        debug!(
            case_id = %case_id,
            household = %actor.household_id,
            ?choice,
            "Vote recorded"
        );
        Ok(case)
    }

    /// Close voting and decide between tender and rejection.
    pub async fn close_voting(&self, case_id: &CaseId) -> CaseResult<Case> {
        let rule = Arc::clone(&self.rule);
        self.repo
            .mutate(case_id, |case, now| {
                ensure_stage(case, CaseStatus::Voting, "close voting on")?;
                case.voting.end_at = Some(now);

                let summary = summarize_voting(case);
                let decision = rule.decide(&summary.tally());
                info!(
                    case_id = %case.id,
                    yes = summary.yes,
                    no = summary.no,
                    abstain = summary.abstain,
                    rule = rule.name(),
                    ?decision,
                    "Voting closed"
                );

                let target = match decision {
                    Decision::Approved => CaseStatus::Tender,
                    Decision::Rejected => CaseStatus::Rejected,
                };
                advance(case, target, "close voting on")
            })
            .await
    }

    /// Close every voting whose deadline has passed.
    ///
    /// One case failing to close does not stop the sweep; its error is
    /// reported next to the cases that did close. Only a failed listing
    /// fails the whole call.
    pub async fn close_expired_votings(&self) -> CaseResult<SweepReport> {
        let now = self.repo.now();
        let expired: Vec<CaseId> = self
            .repo
            .list(CaseFilter::Active)
            .await?
            .into_iter()
            .filter(|case| {
                case.status == CaseStatus::Voting
                    && case.voting.deadline.is_some_and(|deadline| deadline < now)
            })
            .map(|case| case.id)
            .collect();

        let mut report = SweepReport::default();
        for case_id in expired {
            match self.close_voting(&case_id).await {
                Ok(case) => report.closed.push(case),
                // Closed or removed by someone else since the listing.
                Err(CaseError::InvalidTransition { .. }) | Err(CaseError::NotFound(_)) => {}
                Err(err) => {
                    warn!(case_id = %case_id, error = %err, "Expired voting not closed");
                    report.failed.push((case_id, err));
                }
            }
        }

        info!(
            closed = report.closed.len(),
            failed = report.failed.len(),
            "Voting deadline sweep finished"
        );
        Ok(report)
    }
}

/// Outcome of [`VotingEngine::close_expired_votings`]
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Cases closed by this sweep, already committed.
    pub closed: Vec<Case>,
    pub failed: Vec<(CaseId, CaseError)>,
}
