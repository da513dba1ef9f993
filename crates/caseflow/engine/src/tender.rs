//! Tender stage: contractor proposals and per-household proposal votes
//!
//! Any resident may submit any number of proposals. Each household backs
//! at most one proposal at a time. Closing picks the top-ranked proposal
//! (most votes, then cheapest) and routes the case to funding when it
//! needs financing, otherwise straight to execution.

use crate::lifecycle::{advance, ensure_stage};
use crate::repository::CaseRepository;
use crate::tally::{rank_proposals, upsert_by_household, DuplicatePolicy, RankedProposal};
use caseflow_types::{
    Actor, Case, CaseError, CaseId, CaseResult, CaseStatus, Proposal, ProposalDraft, ProposalId,
    ProposalVote, UserId,
};
use tracing::{debug, info};

const DEFAULT_AUTHOR_NAME: &str = "Resident";

/// Who submitted a proposal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalAuthor {
    pub user_id: UserId,
    pub name: Option<String>,
}

impl ProposalAuthor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn display_name(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_AUTHOR_NAME)
            .to_string()
    }
}

/// Proposals with vote counts, best first.
pub fn summarize_tender(case: &Case) -> Vec<RankedProposal> {
    rank_proposals(&case.tender.proposals, &case.tender.votes)
}

#[derive(Clone)]
pub struct TenderEngine {
    repo: CaseRepository,
    duplicate_policy: DuplicatePolicy,
}

impl TenderEngine {
    pub fn new(repo: CaseRepository) -> Self {
        Self {
            repo,
            duplicate_policy: DuplicatePolicy::Overwrite,
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Append a new proposal. Returns the updated case and the new id.
    pub async fn add_proposal(
        &self,
        case_id: &CaseId,
        draft: ProposalDraft,
        author: &ProposalAuthor,
    ) -> CaseResult<(Case, ProposalId)> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(CaseError::Validation(
                "proposal title must not be empty".into(),
            ));
        }

        let proposal_id = ProposalId::generate();
        let case = self
            .repo
            .mutate(case_id, |case, now| {
                ensure_stage(case, CaseStatus::Tender, "add a proposal to")?;
                case.tender.proposals.push(Proposal {
                    id: proposal_id.clone(),
                    title: title.clone(),
                    description: draft.description.clone(),
                    cost: draft.cost,
                    payment_type: draft.payment_type,
                    executor: draft.executor.clone(),
                    timeline: draft.timeline.clone(),
                    author_id: author.user_id.clone(),
                    author_name: author.display_name(),
                    created_at: now,
                });
                Ok(())
            })
            .await?;

        info!(
            case_id = %case_id,
            proposal_id = %proposal_id,
            cost = %draft.cost,
            "Tender proposal added"
        );
        Ok((case, proposal_id))
    }

    /// Record or replace a household's proposal vote.
    pub async fn vote_proposal(
        &self,
        case_id: &CaseId,
        proposal_id: &ProposalId,
        actor: &Actor,
    ) -> CaseResult<Case> {
        let policy = self.duplicate_policy;
        let case = self
            .repo
            .mutate(case_id, |case, now| {
                ensure_stage(case, CaseStatus::Tender, "vote on a proposal of")?;
                if case.tender.proposal(proposal_id).is_none() {
                    return Err(CaseError::ProposalNotFound(proposal_id.clone()));
                }
                let vote = ProposalVote {
                    user_id: actor.user_id.clone(),
                    household_id: actor.household_id.clone(),
                    proposal_id: proposal_id.clone(),
                    at: now,
                };
                upsert_by_household(&mut case.tender.votes, vote, policy)?;
                Ok(())
            })
            .await?;

        debug!(
            case_id = %case_id,
            proposal_id = %proposal_id,
            household = %actor.household_id,
            "Proposal vote recorded"
        );
        Ok(case)
    }

    /// Pick the winner and move on to funding or execution.
    pub async fn close_tender(&self, case_id: &CaseId) -> CaseResult<Case> {
        self.repo
            .mutate(case_id, |case, now| {
                ensure_stage(case, CaseStatus::Tender, "close the tender of")?;
                let winner = summarize_tender(case)
                    .into_iter()
                    .next()
                    .map(|ranked| ranked.proposal.id);

                info!(
                    case_id = %case.id,
                    proposals = case.tender.proposals.len(),
                    winner = winner.as_ref().map(|id| id.0.as_str()).unwrap_or("none"),
                    "Tender closed"
                );

                case.tender.winning_proposal_id = winner;
                case.tender.closed_at = Some(now);
                let target = if case.requires_financing {
                    CaseStatus::Funding
                } else {
                    CaseStatus::Execution
                };
                advance(case, target, "close the tender of")
            })
            .await
    }
}
