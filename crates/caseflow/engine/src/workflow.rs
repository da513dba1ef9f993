//! Facade wiring every stage engine onto one repository

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::execution::ExecutionEngine;
use crate::funding::FundingEngine;
use crate::lifecycle::LifecycleController;
use crate::repository::CaseRepository;
use crate::review::ReviewEngine;
use crate::tender::TenderEngine;
use crate::voting::VotingEngine;
use caseflow_storage::memory::InMemoryCaseStorage;
use caseflow_storage::CaseStorage;
use std::sync::Arc;
use tracing::info;

/// The case workflow engine.
///
/// All engines share one [`CaseRepository`], so they see the same storage,
/// the same clock, and the same conflict-retry budget.
#[derive(Clone)]
pub struct CaseWorkflow {
    repository: CaseRepository,
    voting: VotingEngine,
    tender: TenderEngine,
    funding: FundingEngine,
    execution: ExecutionEngine,
    review: ReviewEngine,
    lifecycle: LifecycleController,
}

impl CaseWorkflow {
    pub fn new(
        storage: Arc<dyn CaseStorage>,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        let repository = CaseRepository::new(storage, clock)
            .with_max_conflict_retries(config.max_conflict_retries);
        let policy = config.duplicate_policy;

        info!(
            duplicate_policy = ?policy,
            max_conflict_retries = config.max_conflict_retries,
            allow_terminal_override = config.allow_terminal_override,
            "Case workflow engine initialized"
        );

        Self {
            voting: VotingEngine::new(repository.clone()).with_duplicate_policy(policy),
            tender: TenderEngine::new(repository.clone()).with_duplicate_policy(policy),
            funding: FundingEngine::new(repository.clone()),
            execution: ExecutionEngine::new(repository.clone())
                .with_default_report(config.default_report.clone()),
            review: ReviewEngine::new(repository.clone()).with_duplicate_policy(policy),
            lifecycle: LifecycleController::new(repository.clone())
                .with_terminal_override(config.allow_terminal_override),
            repository,
        }
    }

    /// Engine over a fresh in-memory store and the system clock.
    pub fn in_memory(config: &EngineConfig) -> Self {
        Self::new(
            Arc::new(InMemoryCaseStorage::new()),
            Arc::new(SystemClock),
            config,
        )
    }

    pub fn repository(&self) -> &CaseRepository {
        &self.repository
    }

    pub fn voting(&self) -> &VotingEngine {
        &self.voting
    }

    pub fn tender(&self) -> &TenderEngine {
        &self.tender
    }

    pub fn funding(&self) -> &FundingEngine {
        &self.funding
    }

    pub fn execution(&self) -> &ExecutionEngine {
        &self.execution
    }

    pub fn review(&self) -> &ReviewEngine {
        &self.review
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }
}
