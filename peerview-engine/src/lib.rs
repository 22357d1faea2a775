//! Effectful half of the peer-review audit workflow.
//!
//! Layers the pure rules from `peerview-core` over async repository traits:
//! - [`workflow::WorkflowEngine`] validates and executes lifecycle
//!   transitions, committing through a compare-and-swap on the status.
//! - [`eligibility::AssignmentEngine`] computes reviewer eligibility and
//!   validates/commits assignments, including the stricter lead-reviewer
//!   path in [`lead`].
//! - [`repository`] defines the traits the surrounding system implements,
//!   plus an in-memory store for tests and embedders.
//!
//! Domain failures (not found, guard violations, lost races) are values in
//! the decision types; [`EngineError`] carries only storage failures and
//! not-found conditions for operations whose result shape has no error list.

use std::fmt;

pub mod eligibility;
pub mod lead;
pub mod repository;
pub mod workflow;

pub use eligibility::{
    AssignmentDecision, AssignmentEngine, AssignmentError, AssignmentResult, EligibleReviewers,
    ReviewerCandidate,
};
pub use lead::{
    LeadAssignmentDecision, LeadAssignmentError, LeadAssignmentOptions, LeadAssignmentResult,
    LeadAssignmentWarning, LeadQualificationStatus, QualificationRequirement,
};
pub use repository::{
    CoiRepository, InMemoryStore, MemberInsert, RepositoryError, ReviewRepository,
    ReviewerRepository, StatusUpdate, StatusUpdateResult,
};
pub use workflow::{
    AvailableTransition, ExecutionResult, TransitionDecision, TransitionError,
    TransitionMetadata, WorkflowEngine,
};

use peerview_core::model::{ReviewId, ReviewerProfileId};

/// Failure channel for operations that cannot report problems in their
/// result shape.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Repository(RepositoryError),
    ReviewNotFound(ReviewId),
    ReviewerNotFound(ReviewerProfileId),
}

impl From<RepositoryError> for EngineError {
    fn from(e: RepositoryError) -> Self {
        Self::Repository(e)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repository(e) => e.fmt(f),
            Self::ReviewNotFound(id) => write!(f, "Review not found: {id}"),
            Self::ReviewerNotFound(id) => write!(f, "Reviewer not found: {id}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Repository(e) => Some(e),
            _ => None,
        }
    }
}
