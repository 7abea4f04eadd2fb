//! Contact Allocator
//!
//! Decision layer over the capacity timeline: filters candidate links
//! through feasibility constraints, checks RF conjunction and lead/trail
//! hand-off coordination, and runs the best-fit channel assignment pass
//! that converts per-step "link is active" signals into committed channel
//! numbers.
//!
//! Control flow per resource: constraint evaluation rejects infeasible
//! candidates, the best-fit pass writes surviving candidates into the
//! timeline strictly in increasing step order, and the conjunction checker
//! validates the committed schedule afterward.

use capacity_timeline::AllocationError;
use thiserror::Error;

pub mod bestfit;
pub mod conjunction;
pub mod constraints;
pub mod loader;
pub mod report;

pub use bestfit::{AllocationFailure, AllocationPass, BestFit};
pub use conjunction::LeadTrailPair;
pub use constraints::RejectReason;
pub use loader::Scenario;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scenario contains no resources")]
    EmptyScenario,
}

pub type Result<T> = std::result::Result<T, PlannerError>;
