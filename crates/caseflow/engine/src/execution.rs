//! Execution stage: start and finish the work

use crate::config::DEFAULT_REPORT;
use crate::lifecycle::{advance, ensure_stage};
use crate::repository::CaseRepository;
use caseflow_types::{Case, CaseId, CaseResult, CaseStatus};
use tracing::info;

#[derive(Clone)]
pub struct ExecutionEngine {
    repo: CaseRepository,
    default_report: String,
}

impl ExecutionEngine {
    pub fn new(repo: CaseRepository) -> Self {
        Self {
            repo,
            default_report: DEFAULT_REPORT.to_string(),
        }
    }

    pub fn with_default_report(mut self, report: impl Into<String>) -> Self {
        self.default_report = report.into();
        self
    }

    /// Mark the work as started. A second call keeps the first timestamp.
    pub async fn start(&self, case_id: &CaseId) -> CaseResult<Case> {
        self.repo
            .mutate(case_id, |case, now| {
                ensure_stage(case, CaseStatus::Execution, "start execution of")?;
                if case.execution.started_at.is_none() {
                    case.execution.started_at = Some(now);
                    info!(case_id = %case.id, "Execution started");
                }
                Ok(())
            })
            .await
    }

    /// Record the report and hand the case over to review.
    ///
    /// A blank or missing report is replaced by the configured default.
    /// Finishing without an explicit start stamps both times.
    pub async fn finish(&self, case_id: &CaseId, report: Option<&str>) -> CaseResult<Case> {
        let report = report
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(&self.default_report)
            .to_string();

        self.repo
            .mutate(case_id, |case, now| {
                ensure_stage(case, CaseStatus::Execution, "finish execution of")?;
                case.execution.started_at.get_or_insert(now);
                case.execution.finished_at = Some(now);
                case.execution.report = Some(report.clone());
                advance(case, CaseStatus::Review, "finish execution of")
            })
            .await
    }
}
