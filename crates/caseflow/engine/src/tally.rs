//! Tally: the one place ballots are deduplicated, counted, and ranked
//!
//! Voting ballots, proposal votes, and reviews all obey the same
//! one-entry-per-household rule. The duplicate policy decides whether a
//! second entry replaces the first or is refused. Decisions on counted
//! ballots go through a pluggable [`DecisionRule`].

use caseflow_types::{
    CaseError, HouseholdId, Proposal, ProposalId, ProposalVote, Review, Vote, VoteChoice,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Household uniqueness ─────────────────────────────────────────────

/// An entry cast on behalf of a household.
pub trait HouseholdScoped {
    fn household(&self) -> &HouseholdId;
}

impl HouseholdScoped for Vote {
    fn household(&self) -> &HouseholdId {
        &self.household_id
    }
}

impl HouseholdScoped for ProposalVote {
    fn household(&self) -> &HouseholdId {
        &self.household_id
    }
}

impl HouseholdScoped for Review {
    fn household(&self) -> &HouseholdId {
        &self.household_id
    }
}

/// What to do when a household casts a second entry in the same stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The latest entry replaces the earlier one in place.
    #[default]
    Overwrite,
    /// The second entry is refused.
    Reject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Insert `entry`, keeping at most one entry per household.
pub fn upsert_by_household<T: HouseholdScoped>(
    entries: &mut Vec<T>,
    entry: T,
    policy: DuplicatePolicy,
) -> Result<UpsertOutcome, CaseError> {
    match entries
        .iter()
        .position(|existing| existing.household() == entry.household())
    {
        None => {
            entries.push(entry);
            Ok(UpsertOutcome::Inserted)
        }
        Some(_) if policy == DuplicatePolicy::Reject => Err(CaseError::DuplicateBallot {
            household: entry.household().clone(),
        }),
        Some(index) => {
            entries[index] = entry;
            Ok(UpsertOutcome::Replaced)
        }
    }
}

// ── Yes/no decisions ─────────────────────────────────────────────────

/// Counted yes/no/abstain ballots
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotTally {
    pub yes: usize,
    pub no: usize,
    pub abstain: usize,
}

impl BallotTally {
    pub fn count<'a>(choices: impl IntoIterator<Item = &'a VoteChoice>) -> Self {
        choices
            .into_iter()
            .fold(BallotTally::default(), |mut tally, choice| {
                match choice {
                    VoteChoice::Yes => tally.yes += 1,
                    VoteChoice::No => tally.no += 1,
                    VoteChoice::Abstain => tally.abstain += 1,
                }
                tally
            })
    }

    pub fn total(&self) -> usize {
        self.yes + self.no + self.abstain
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

/// Turns a tally into a decision.
pub trait DecisionRule: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;
    fn decide(&self, tally: &BallotTally) -> Decision;
}

/// More yes than no among cast ballots. Ties, abstain-only, and empty
/// tallies reject. No quorum.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrictMajority;

impl DecisionRule for StrictMajority {
    fn name(&self) -> &'static str {
        "strict_majority"
    }

    fn decide(&self, tally: &BallotTally) -> Decision {
        if tally.yes > tally.no {
            Decision::Approved
        } else {
            Decision::Rejected
        }
    }
}

// ── Proposal ranking ─────────────────────────────────────────────────

/// A proposal annotated with its vote count
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedProposal {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub votes: usize,
}

/// Rank proposals by vote count descending, then cost ascending.
/// Remaining ties keep submission order.
pub fn rank_proposals(proposals: &[Proposal], votes: &[ProposalVote]) -> Vec<RankedProposal> {
    let mut counts: HashMap<&ProposalId, usize> = HashMap::new();
    for vote in votes {
        *counts.entry(&vote.proposal_id).or_default() += 1;
    }

    let mut ranked: Vec<RankedProposal> = proposals
        .iter()
        .map(|proposal| RankedProposal {
            votes: counts.get(&proposal.id).copied().unwrap_or(0),
            proposal: proposal.clone(),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| a.proposal.cost.cmp(&b.proposal.cost))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_types::{Amount, InitiatorOpinion, PaymentType, UserId};
    use chrono::Utc;

    fn vote(household: &str, choice: VoteChoice) -> Vote {
        Vote {
            user_id: UserId::new(format!("u-{household}")),
            household_id: HouseholdId::new(household),
            choice,
            initiator_opinion: InitiatorOpinion::No,
            at: Utc::now(),
        }
    }

    fn proposal(id: &str, cost: u64) -> Proposal {
        Proposal {
            id: ProposalId::new(id),
            title: id.to_string(),
            description: String::new(),
            cost: Amount::units(cost),
            payment_type: PaymentType::Prepaid,
            executor: String::new(),
            timeline: String::new(),
            author_id: UserId::new("author"),
            author_name: "Author".to_string(),
            created_at: Utc::now(),
        }
    }

    fn proposal_vote(household: &str, proposal: &str) -> ProposalVote {
        ProposalVote {
            user_id: UserId::new(format!("u-{household}")),
            household_id: HouseholdId::new(household),
            proposal_id: ProposalId::new(proposal),
            at: Utc::now(),
        }
    }

    #[test]
    fn overwrite_keeps_one_entry_in_place() {
        let mut votes = vec![vote("h1", VoteChoice::Yes), vote("h2", VoteChoice::No)];
        let outcome =
            upsert_by_household(&mut votes, vote("h1", VoteChoice::No), DuplicatePolicy::Overwrite)
                .unwrap();

        assert_eq!(outcome, UpsertOutcome::Replaced);
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].household_id, HouseholdId::new("h1"));
        assert_eq!(votes[0].choice, VoteChoice::No);
    }

    #[test]
    fn reject_refuses_second_entry() {
        let mut votes = vec![vote("h1", VoteChoice::Yes)];
        let err =
            upsert_by_household(&mut votes, vote("h1", VoteChoice::No), DuplicatePolicy::Reject)
                .unwrap_err();

        assert!(matches!(err, CaseError::DuplicateBallot { .. }));
        assert_eq!(votes[0].choice, VoteChoice::Yes);

        let outcome =
            upsert_by_household(&mut votes, vote("h2", VoteChoice::No), DuplicatePolicy::Reject)
                .unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);
    }

    #[test]
    fn strict_majority_rejects_ties_and_empty() {
        let rule = StrictMajority;
        let tally = |yes, no, abstain| BallotTally { yes, no, abstain };

        assert_eq!(rule.decide(&tally(3, 1, 0)), Decision::Approved);
        assert_eq!(rule.decide(&tally(1, 1, 5)), Decision::Rejected);
        assert_eq!(rule.decide(&tally(0, 0, 0)), Decision::Rejected);
        assert_eq!(rule.decide(&tally(0, 0, 4)), Decision::Rejected);
        assert_eq!(rule.decide(&tally(1, 0, 9)), Decision::Approved);
    }

    #[test]
    fn counts_choices() {
        let choices = [
            VoteChoice::Yes,
            VoteChoice::Abstain,
            VoteChoice::Yes,
            VoteChoice::No,
        ];
        let tally = BallotTally::count(&choices);
        assert_eq!(tally, BallotTally { yes: 2, no: 1, abstain: 1 });
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn ranks_by_votes_then_cheaper_cost() {
        let proposals = vec![proposal("A", 100), proposal("B", 80), proposal("C", 50)];
        let votes = vec![
            proposal_vote("h1", "A"),
            proposal_vote("h2", "A"),
            proposal_vote("h3", "B"),
            proposal_vote("h4", "B"),
            proposal_vote("h5", "C"),
        ];

        let ranked = rank_proposals(&proposals, &votes);
        let order: Vec<&str> = ranked.iter().map(|r| r.proposal.id.0.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
        assert_eq!(ranked[0].votes, 2);
        assert_eq!(ranked[2].votes, 1);
    }

    #[test]
    fn full_ties_keep_submission_order() {
        let proposals = vec![proposal("first", 10), proposal("second", 10)];
        let ranked = rank_proposals(&proposals, &[]);
        assert_eq!(ranked[0].proposal.id, ProposalId::new("first"));
        assert_eq!(ranked[0].votes, 0);
    }
}
