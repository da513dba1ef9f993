//! The case document and its creation input

use crate::{
    Amount, CaseError, CaseId, CaseResult, CaseStatus, ExecutionRecord, FundingRecord,
    HouseholdId, Review, TenderRecord, UserId, VotingRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One governance matter moving through the lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: CaseId,
    pub title: String,
    pub text: String,
    pub status: CaseStatus,
    /// Households eligible to take part. Empty means open to everyone.
    pub participants: BTreeSet<HouseholdId>,
    pub requires_financing: bool,
    pub requires_initiator: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by every committed write.
    #[serde(default)]
    pub version: u64,

    #[serde(default)]
    pub voting: VotingRecord,
    #[serde(default)]
    pub tender: TenderRecord,
    #[serde(default)]
    pub funding: FundingRecord,
    #[serde(default)]
    pub execution: ExecutionRecord,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Case {
    /// Build a draft case from validated input.
    pub fn new(input: NewCase, now: DateTime<Utc>) -> CaseResult<Self> {
        input.validate()?;
        Ok(Self {
            id: CaseId::generate(),
            title: input.title.trim().to_string(),
            text: input.text,
            status: CaseStatus::Draft,
            participants: input.participants.into_iter().collect(),
            requires_financing: input.requires_financing,
            requires_initiator: input.requires_initiator,
            created_by: input.created_by.unwrap_or_else(UserId::system),
            created_at: now,
            updated_at: now,
            version: 0,
            voting: VotingRecord::default(),
            tender: TenderRecord::default(),
            funding: FundingRecord {
                target_amount: input.funding_target,
                ..Default::default()
            },
            execution: ExecutionRecord::default(),
            reviews: Vec::new(),
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the household may see and act on this case.
    pub fn is_open_to(&self, household: &HouseholdId) -> bool {
        self.participants.is_empty() || self.participants.contains(household)
    }
}

/// Administrative input for creating a case.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCase {
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub participants: Vec<HouseholdId>,
    #[serde(default)]
    pub requires_financing: bool,
    #[serde(default)]
    pub requires_initiator: bool,
    #[serde(default)]
    pub created_by: Option<UserId>,
    #[serde(default)]
    pub funding_target: Amount,
}

impl NewCase {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_participant(mut self, household: impl Into<String>) -> Self {
        self.participants.push(HouseholdId::new(household));
        self
    }

    pub fn with_financing(mut self, target: Amount) -> Self {
        self.requires_financing = true;
        self.funding_target = target;
        self
    }

    pub fn with_initiator_required(mut self) -> Self {
        self.requires_initiator = true;
        self
    }

    pub fn created_by(mut self, user: UserId) -> Self {
        self.created_by = Some(user);
        self
    }

    pub fn validate(&self) -> CaseResult<()> {
        if self.title.trim().is_empty() {
            return Err(CaseError::Validation("case title must not be empty".into()));
        }
        if self.requires_financing && self.funding_target.is_zero() {
            return Err(CaseError::Validation(
                "a case that requires financing needs a positive funding target".into(),
            ));
        }
        Ok(())
    }
}
