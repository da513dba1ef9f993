//! Stage sub-records embedded in a case
//!
//! Each stage owns one record. Ballot-like entries (votes, proposal
//! votes, reviews) carry the household that cast them so the tally
//! layer can enforce one entry per household.

use crate::{Amount, HouseholdId, ProposalId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Voting ───────────────────────────────────────────────────────────

/// A household's answer to the case question
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

/// Whether the voter is willing to act as the case initiator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitiatorOpinion {
    Yes,
    #[default]
    No,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub user_id: UserId,
    pub household_id: HouseholdId,
    pub choice: VoteChoice,
    #[serde(default)]
    pub initiator_opinion: InitiatorOpinion,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingRecord {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    /// Scheduled close; expired votings are closed by the deadline sweep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub votes: Vec<Vote>,
}

// ── Tender ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    #[default]
    Prepaid,
    Postpaid,
}

/// A contractor bid submitted during the tender stage
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub cost: Amount,
    pub payment_type: PaymentType,
    pub executor: String,
    pub timeline: String,
    pub author_id: UserId,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

/// Caller input for a new proposal
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub cost: Amount,
    #[serde(default)]
    pub payment_type: PaymentType,
    #[serde(default)]
    pub executor: String,
    #[serde(default)]
    pub timeline: String,
}

impl ProposalDraft {
    pub fn new(title: impl Into<String>, cost: Amount) -> Self {
        Self {
            title: title.into(),
            cost,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_executor(mut self, executor: impl Into<String>) -> Self {
        self.executor = executor.into();
        self
    }

    pub fn with_timeline(mut self, timeline: impl Into<String>) -> Self {
        self.timeline = timeline.into();
        self
    }

    pub fn with_payment_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = payment_type;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalVote {
    pub user_id: UserId,
    pub household_id: HouseholdId,
    pub proposal_id: ProposalId,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderRecord {
    #[serde(default)]
    pub proposals: Vec<Proposal>,
    #[serde(default)]
    pub votes: Vec<ProposalVote>,
    pub winning_proposal_id: Option<ProposalId>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl TenderRecord {
    pub fn proposal(&self, id: &ProposalId) -> Option<&Proposal> {
        self.proposals.iter().find(|p| &p.id == id)
    }
}

// ── Funding ──────────────────────────────────────────────────────────

/// A funding contribution. Households may pledge any number of times.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pledge {
    pub user_id: UserId,
    pub household_id: HouseholdId,
    pub amount: Amount,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRecord {
    pub target_amount: Amount,
    #[serde(default)]
    pub pledges: Vec<Pledge>,
    pub closed_at: Option<DateTime<Utc>>,
}

// ── Execution ────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report: Option<String>,
}

// ── Review ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user_id: UserId,
    pub household_id: HouseholdId,
    /// Always within 1..=10.
    pub score: u8,
    #[serde(default)]
    pub comment: String,
    pub at: DateTime<Utc>,
}
