//! Caseflow storage abstractions.
//!
//! This crate defines the persistence port the case engine depends on:
//! - case documents keyed by id, written with a compare-and-set on
//!   `Case::version` so concurrent writers cannot silently lose updates
//! - an append-only, hash-linked audit chain for privileged status overrides
//!
//! Design stance:
//! - The engine never owns state; everything goes through these traits.
//! - A transactional database keyed by case id is the production target.
//!   The in-memory adapter is the reference implementation for tests.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
mod traits;

pub use error::{StorageError, StorageResult};
pub use model::{OverrideAppend, OverrideRecord};
pub use traits::{CaseStorage, CaseStore, OverrideAuditStore};
