//! Review stage: household ratings and archival
//!
//! Scores are clamped into 1..=10 rather than refused. One review per
//! household, same as every other ballot.

use crate::lifecycle::{advance, ensure_stage};
use crate::repository::CaseRepository;
use crate::tally::{upsert_by_household, DuplicatePolicy};
use caseflow_types::{Actor, Case, CaseId, CaseResult, CaseStatus, Review};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

/// Clamp a raw score into the accepted range.
pub fn clamp_score(raw: i64) -> u8 {
    raw.clamp(MIN_SCORE as i64, MAX_SCORE as i64) as u8
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub count: usize,
    /// Mean score rounded half-up to one decimal; 0.0 with no reviews.
    pub average: f64,
}

pub fn summarize_reviews(case: &Case) -> ReviewSummary {
    let count = case.reviews.len();
    if count == 0 {
        return ReviewSummary {
            count,
            average: 0.0,
        };
    }
    let sum: u64 = case.reviews.iter().map(|review| review.score as u64).sum();
    // tenths, rounded half-up in integer space
    let tenths = (sum * 20 + count as u64) / (count as u64 * 2);
    ReviewSummary {
        count,
        average: tenths as f64 / 10.0,
    }
}

#[derive(Clone)]
pub struct ReviewEngine {
    repo: CaseRepository,
    duplicate_policy: DuplicatePolicy,
}

impl ReviewEngine {
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

    /// Record or replace a household's review.
    pub async fn add_review(
        &self,
        case_id: &CaseId,
        actor: &Actor,
        score: i64,
        comment: &str,
    ) -> CaseResult<Case> {
        let score = clamp_score(score);
        let comment = comment.trim().to_string();
        let policy = self.duplicate_policy;

        let case = self
            .repo
            .mutate(case_id, |case, now| {
                ensure_stage(case, CaseStatus::Review, "review")?;
                let review = Review {
                    user_id: actor.user_id.clone(),
                    household_id: actor.household_id.clone(),
                    score,
                    comment: comment.clone(),
                    at: now,
                };
                upsert_by_household(&mut case.reviews, review, policy)?;
                Ok(())
            })
            .await?;

        debug!(
            case_id = %case_id,
            household = %actor.household_id,
            score,
            "Review recorded"
        );
        Ok(case)
    }

    /// Archive a reviewed case. Archiving an archived case changes nothing.
    pub async fn archive(&self, case_id: &CaseId) -> CaseResult<Case> {
        let current = self.repo.require(case_id).await?;
        if current.status == CaseStatus::Archived {
            return Ok(current);
        }

        self.repo
            .mutate(case_id, |case, _| {
                if case.status == CaseStatus::Archived {
                    return Ok(());
                }
                ensure_stage(case, CaseStatus::Review, "archive")?;
                let summary = summarize_reviews(case);
                info!(
                    case_id = %case.id,
                    reviews = summary.count,
                    average = summary.average,
                    "Case archived"
                );
                advance(case, CaseStatus::Archived, "archive")
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use caseflow_storage::memory::InMemoryCaseStorage;
    use caseflow_types::{CaseError, NewCase};
    use std::sync::Arc;

    async fn reviewing() -> (ReviewEngine, CaseRepository, CaseId) {
        let repo = CaseRepository::new(Arc::new(InMemoryCaseStorage::new()), Arc::new(SystemClock));
        let case = repo.create(NewCase::new("Bench painting")).await.unwrap();
        repo.mutate(&case.id, |case, _| {
            case.status = CaseStatus::Review;
            Ok(())
        })
        .await
        .unwrap();
        (ReviewEngine::new(repo.clone()), repo, case.id)
    }

    #[test]
    fn scores_are_clamped() {
        assert_eq!(clamp_score(15), 10);
        assert_eq!(clamp_score(-3), 1);
        assert_eq!(clamp_score(0), 1);
        assert_eq!(clamp_score(7), 7);
    }

    #[tokio::test]
    async fn average_rounds_to_one_decimal() {
        let (engine, _, id) = reviewing().await;
        for (household, score) in [("h1", 7), ("h2", 8), ("h3", 9)] {
            engine
                .add_review(&id, &Actor::new("u", household), score, "")
                .await
                .unwrap();
        }
        let case = engine
            .add_review(&id, &Actor::new("u", "h4"), 15, "great")
            .await
            .unwrap();
        assert_eq!(case.reviews[3].score, 10);
        assert_eq!(summarize_reviews(&case).average, 8.5);
    }

    #[tokio::test]
    async fn average_of_seven_and_eight() {
        let (engine, _, id) = reviewing().await;
        engine.add_review(&id, &Actor::new("u1", "h1"), 7, "").await.unwrap();
        let case = engine.add_review(&id, &Actor::new("u2", "h2"), 8, "").await.unwrap();
        let summary = summarize_reviews(&case);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average, 7.5);
    }

    #[test]
    fn integer_half_up_rounding() {
        let mut case = Case::new(NewCase::new("Rounding"), chrono::Utc::now()).unwrap();
        for (i, score) in [7u8, 8, 9].into_iter().enumerate() {
            case.reviews.push(Review {
                user_id: caseflow_types::UserId::new("u"),
                household_id: caseflow_types::HouseholdId::new(format!("h{i}")),
                score,
                comment: String::new(),
                at: chrono::Utc::now(),
            });
        }
        assert_eq!(summarize_reviews(&case).average, 8.0);

        // 1 + 1 + 2 = 4 / 3 = 1.333.. -> 1.3
        for (review, score) in case.reviews.iter_mut().zip([1u8, 1, 2]) {
            review.score = score;
        }
        assert_eq!(summarize_reviews(&case).average, 1.3);

        case.reviews.clear();
        assert_eq!(summarize_reviews(&case).average, 0.0);
    }

    #[tokio::test]
    async fn household_review_is_replaced() {
        let (engine, _, id) = reviewing().await;
        engine.add_review(&id, &Actor::new("u1", "h1"), 3, "late").await.unwrap();
        let case = engine
            .add_review(&id, &Actor::new("u2", "h1"), -3, "worse")
            .await
            .unwrap();
        assert_eq!(case.reviews.len(), 1);
        assert_eq!(case.reviews[0].score, 1);
        assert_eq!(case.reviews[0].comment, "worse");
    }

    #[tokio::test]
    async fn reject_policy_refuses_second_review() {
        let (engine, _, id) = reviewing().await;
        let engine = engine.with_duplicate_policy(DuplicatePolicy::Reject);
        engine.add_review(&id, &Actor::new("u1", "h1"), 5, "").await.unwrap();
        let err = engine
            .add_review(&id, &Actor::new("u1", "h1"), 6, "")
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::DuplicateBallot { .. }));
    }

    #[tokio::test]
    async fn archive_twice_is_a_no_op() {
        let (engine, repo, id) = reviewing().await;
        let archived = engine.archive(&id).await.unwrap();
        assert_eq!(archived.status, CaseStatus::Archived);

        let again = engine.archive(&id).await.unwrap();
        assert_eq!(again.status, CaseStatus::Archived);
        assert_eq!(again.version, archived.version);
        assert_eq!(repo.require(&id).await.unwrap().version, archived.version);

        let err = engine
            .add_review(&id, &Actor::new("u1", "h1"), 5, "")
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::InvalidTransition { .. }));
    }
}
