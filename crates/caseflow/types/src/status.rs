//! Case status and the forward-only transition table

use serde::{Deserialize, Serialize};

/// Lifecycle status of a case.
///
/// ```text
/// draft → voting → {tender | rejected}
/// tender → {funding | execution}
/// funding → execution → review → archived
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Draft,
    Voting,
    Tender,
    Funding,
    Execution,
    Review,
    Archived,
    Rejected,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 8] = [
        CaseStatus::Draft,
        CaseStatus::Voting,
        CaseStatus::Tender,
        CaseStatus::Funding,
        CaseStatus::Execution,
        CaseStatus::Review,
        CaseStatus::Archived,
        CaseStatus::Rejected,
    ];

    /// No stage operation may mutate a case in a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Archived | CaseStatus::Rejected)
    }

    /// Legal next statuses reachable through a stage-close operation.
    pub fn successors(&self) -> &'static [CaseStatus] {
        match self {
            CaseStatus::Draft => &[CaseStatus::Voting],
            CaseStatus::Voting => &[CaseStatus::Tender, CaseStatus::Rejected],
            CaseStatus::Tender => &[CaseStatus::Funding, CaseStatus::Execution],
            CaseStatus::Funding => &[CaseStatus::Execution],
            CaseStatus::Execution => &[CaseStatus::Review],
            CaseStatus::Review => &[CaseStatus::Archived],
            CaseStatus::Archived | CaseStatus::Rejected => &[],
        }
    }

    pub fn can_advance_to(&self, target: CaseStatus) -> bool {
        self.successors().contains(&target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Draft => "draft",
            CaseStatus::Voting => "voting",
            CaseStatus::Tender => "tender",
            CaseStatus::Funding => "funding",
            CaseStatus::Execution => "execution",
            CaseStatus::Review => "review",
            CaseStatus::Archived => "archived",
            CaseStatus::Rejected => "rejected",
        }
    }

    /// Map a stage name onto the canonical status.
    ///
    /// Accepts the canonical names plus the older eight-stage ballot
    /// taxonomy, whose three financing stages collapse into `Funding`.
    /// Unknown names (including the legacy poll status `closed`, whose
    /// outcome cannot be inferred) yield `None`.
    pub fn from_legacy_stage(stage: &str) -> Option<CaseStatus> {
        let status = match stage.trim() {
            "draft" => CaseStatus::Draft,
            "voting" => CaseStatus::Voting,
            "tender" => CaseStatus::Tender,
            "funding" | "financing_calc" | "financing" | "additional_funding" => {
                CaseStatus::Funding
            }
            "execution" | "in_progress" => CaseStatus::Execution,
            "review" | "completed" => CaseStatus::Review,
            "archived" => CaseStatus::Archived,
            "rejected" => CaseStatus::Rejected,
            _ => return None,
        };
        Some(status)
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing filter for the case repository.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFilter {
    #[default]
    All,
    /// Everything not yet terminal.
    Active,
    /// Terminal cases: archived and rejected.
    Archived,
}

impl CaseFilter {
    pub fn matches(&self, status: CaseStatus) -> bool {
        match self {
            CaseFilter::All => true,
            CaseFilter::Active => !status.is_terminal(),
            CaseFilter::Archived => status.is_terminal(),
        }
    }
}
