//! Case Domain Types for Caseflow
//!
//! A **case** is one governance matter raised by residents. It moves
//! through a forward-only sequence of stages, each owning its own
//! sub-record on the case document:
//!
//! - **Voting**: per-household yes/no/abstain ballots plus the optional
//!   "willing to be initiator" signal.
//! - **Tender**: contractor proposals and per-household proposal votes.
//! - **Funding**: pledges summed against a target amount.
//! - **Execution**: start/finish markers and a completion report.
//! - **Review**: per-household 1–10 scores.
//!
//! # Design Principles
//!
//! 1. The case is a plain document. Stage engines mutate it; this crate
//!    only describes its shape and the legal status edges.
//! 2. `Archived` and `Rejected` are terminal.
//! 3. Money is integer minor units, never floating point.

#![deny(unsafe_code)]

mod amount;
mod case;
mod errors;
mod ids;
mod stage;
mod status;

pub use amount::*;
pub use case::*;
pub use errors::*;
pub use ids::*;
pub use stage::*;
pub use status::*;
