//! Repository abstractions over the surrounding system's data store.
//!
//! The engine does not own persistence. These traits describe exactly what
//! it needs to read, plus the two conditional writes it performs: the
//! compare-and-swap status update and the exclusive lead-member insert.
//! Implementations must make both conditional writes atomic with respect to
//! concurrent callers; the bundled [`memory::InMemoryStore`] does so by
//! holding a single write lock across check and write.

pub mod memory;

pub use memory::InMemoryStore;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use peerview_core::model::{
    CoiOverride, OrganizationId, Review, ReviewId, ReviewSnapshot, ReviewTeamMember,
    ReviewerCoi, ReviewerProfile, ReviewerProfileId, TeamId, TeamMemberId,
};
use peerview_core::status::ReviewStatus;

/// Storage-level failure. Domain outcomes (not-found, conflict, seat taken)
/// are expressed in result enums, never through this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    Storage { op: &'static str, message: String },
}

impl RepositoryError {
    pub fn storage(op: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            op,
            message: message.into(),
        }
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage { op, message } => write!(f, "storage failure during {op}: {message}"),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// The write half of a status transition. Date fields are only provided
/// when the executor decided to stamp them; `append_note` carries a
/// cancellation reason when one was given.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: ReviewStatus,
    pub actual_start_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    pub append_note: Option<String>,
}

impl StatusUpdate {
    pub fn to_status(status: ReviewStatus) -> Self {
        Self {
            status,
            actual_start_date: None,
            actual_end_date: None,
            append_note: None,
        }
    }
}

/// Outcome of a conditional status update.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdateResult {
    /// The stored status matched `expected`; the update was applied.
    Updated(Review),
    /// The stored status no longer matches what was validated against.
    Conflict { actual: ReviewStatus },
    NotFound,
}

/// Outcome of a team-member insert.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberInsert {
    Inserted(ReviewTeamMember),
    /// Another active lead reviewer already holds the seat.
    LeadSeatTaken,
    ReviewNotFound,
}

/// Read/write access to reviews and their owned entities.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Load a review with its team members, findings and report.
    async fn snapshot(&self, id: &ReviewId) -> Result<Option<ReviewSnapshot>, RepositoryError>;

    /// Conditionally update the review's status.
    ///
    /// The update must be applied only if the stored status still equals
    /// `expected`, atomically with respect to concurrent updates.
    async fn update_status(
        &self,
        id: &ReviewId,
        expected: ReviewStatus,
        update: StatusUpdate,
    ) -> Result<StatusUpdateResult, RepositoryError>;

    /// Insert a non-lead team member.
    async fn insert_member(
        &self,
        member: ReviewTeamMember,
    ) -> Result<MemberInsert, RepositoryError>;

    /// Insert a lead team member, failing with [`MemberInsert::LeadSeatTaken`]
    /// if another active lead exists. The uniqueness check and the insert
    /// must be atomic. `replacing` names a membership row being replaced,
    /// which is excluded from the check; a row for the same reviewer profile
    /// is excluded as well (re-assigning the current lead is not a conflict).
    async fn insert_lead_member(
        &self,
        member: ReviewTeamMember,
        replacing: Option<TeamMemberId>,
    ) -> Result<MemberInsert, RepositoryError>;
}

/// Read access to reviewer profiles and the org/team directory.
#[async_trait]
pub trait ReviewerRepository: Send + Sync {
    async fn profile(
        &self,
        id: &ReviewerProfileId,
    ) -> Result<Option<ReviewerProfile>, RepositoryError>;

    /// Profiles assignable on the given date: certified or lead-qualified,
    /// available, and inside their availability window if one is set.
    async fn assignable_profiles(
        &self,
        on: NaiveDate,
    ) -> Result<Vec<ReviewerProfile>, RepositoryError>;

    /// Regional team the organization belongs to, if any.
    async fn regional_team_of(
        &self,
        organization: &OrganizationId,
    ) -> Result<Option<TeamId>, RepositoryError>;
}

/// Read access to declared conflicts of interest and approved overrides.
#[async_trait]
pub trait CoiRepository: Send + Sync {
    async fn active_conflicts(
        &self,
        reviewer: &ReviewerProfileId,
        organization: &OrganizationId,
    ) -> Result<Vec<ReviewerCoi>, RepositoryError>;

    /// A non-revoked override scoped to the exact
    /// `(reviewer, organization, review)` triple, if one exists.
    async fn approved_override(
        &self,
        reviewer: &ReviewerProfileId,
        organization: &OrganizationId,
        review: &ReviewId,
    ) -> Result<Option<CoiOverride>, RepositoryError>;
}
