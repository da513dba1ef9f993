//! Case Workflow Engine
//!
//! Turns a raised issue into a tallied decision, a ranked contractor
//! selection, a funding total, and a final rating. The engine never
//! authenticates, renders, or talks to a network: callers pass resolved
//! identities, and every read and write goes through the injected
//! [`caseflow_storage::CaseStorage`] port.
//!
//! # Architecture
//!
//! ```text
//! CaseWorkflow
//! ├── CaseRepository      load / optimistic write / list / delete
//! ├── VotingEngine        draft → voting → tender | rejected
//! ├── TenderEngine        tender → funding | execution
//! ├── FundingEngine       funding → execution
//! ├── ExecutionEngine     execution → review
//! ├── ReviewEngine        review → archived
//! └── LifecycleController status guards + audited override
//! ```
//!
//! Every mutating operation is load → mutate in memory → compare-and-set
//! write of the whole case, retried on version conflicts. A failed
//! operation commits nothing.

#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod execution;
pub mod funding;
pub mod lifecycle;
pub mod repository;
pub mod review;
pub mod tally;
pub mod telemetry;
pub mod tender;
pub mod voting;
mod workflow;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{EngineConfig, LoggingConfig};
pub use execution::ExecutionEngine;
pub use funding::{summarize_funding, total_pledged, FundingEngine, FundingSummary};
pub use lifecycle::LifecycleController;
pub use repository::CaseRepository;
pub use review::{summarize_reviews, ReviewEngine, ReviewSummary};
pub use tally::{
    BallotTally, Decision, DecisionRule, DuplicatePolicy, RankedProposal, StrictMajority,
};
pub use tender::{summarize_tender, ProposalAuthor, TenderEngine};
pub use voting::{summarize_voting, SweepReport, VotingEngine, VotingSummary};
pub use workflow::CaseWorkflow;

pub use caseflow_storage as storage;
pub use caseflow_types as types;
