//! Domain entities for the review workflow.
//!
//! These mirror the records owned by the surrounding system's Review Store.
//! The engine reads them and, through the transition executor, writes back
//! exactly one thing: the review's status and its derived date/note fields.
//!
//! [`ReviewSnapshot`] is the read-view the guard functions evaluate against:
//! a review plus its team members, findings and report, loaded at one point
//! in time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::ReviewStatus;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a review (the aggregate root).
    ReviewId
);
uuid_id!(
    /// Identifier of a reviewer's profile record.
    ReviewerProfileId
);
uuid_id!(
    /// Identifier of an organization (host or home).
    OrganizationId
);
uuid_id!(
    /// Identifier of a regional team.
    TeamId
);
uuid_id!(
    /// Identifier of a user account.
    UserId
);
uuid_id!(
    /// Identifier of a review team membership row.
    TeamMemberId
);
uuid_id!(
    /// Identifier of a finding.
    FindingId
);

/// Role a member holds on a review team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamRole {
    LeadReviewer,
    PeerReviewer,
    TechnicalExpert,
    Observer,
}

/// Invitation state of a team member.
///
/// Declined and withdrawn members are excluded from every "active" count,
/// including the single-lead uniqueness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Withdrawn,
}

/// A reviewer's membership on one review team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewTeamMember {
    pub id: TeamMemberId,
    pub review_id: ReviewId,
    pub reviewer_profile_id: ReviewerProfileId,
    pub role: TeamRole,
    pub invitation_status: InvitationStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl ReviewTeamMember {
    /// New membership row, invitation pending, not yet confirmed.
    pub fn new(review_id: ReviewId, reviewer_profile_id: ReviewerProfileId, role: TeamRole) -> Self {
        Self {
            id: TeamMemberId::new(),
            review_id,
            reviewer_profile_id,
            role,
            invitation_status: InvitationStatus::Pending,
            confirmed_at: None,
        }
    }

    /// Active means the member has not declined or withdrawn.
    pub fn is_active(&self) -> bool {
        !matches!(
            self.invitation_status,
            InvitationStatus::Declined | InvitationStatus::Withdrawn
        )
    }

    /// Confirmed means the invitee accepted and a confirmation timestamp exists.
    pub fn is_confirmed(&self) -> bool {
        self.invitation_status == InvitationStatus::Accepted && self.confirmed_at.is_some()
    }
}

/// Certification status of a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewerStatus {
    Trainee,
    Certified,
    LeadQualified,
    Suspended,
}

/// A reviewer's profile. Read-only from this engine's perspective;
/// counters and certification are maintained by external bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerProfile {
    pub id: ReviewerProfileId,
    pub user_id: UserId,
    /// Organization of the underlying user account.
    pub organization_id: OrganizationId,
    /// Explicit home organization; falls back to `organization_id` if unset.
    pub home_organization_id: Option<OrganizationId>,
    pub status: ReviewerStatus,
    /// Lead certification flag; may diverge from `status`.
    pub is_lead_qualified: bool,
    pub reviews_completed: u32,
    pub reviews_as_lead: u32,
    pub is_available: bool,
    pub available_from: Option<NaiveDate>,
    pub available_to: Option<NaiveDate>,
}

impl ReviewerProfile {
    /// The organization this reviewer is attributed to for conflict checks.
    pub fn effective_organization(&self) -> OrganizationId {
        self.home_organization_id.unwrap_or(self.organization_id)
    }

    /// Whether this reviewer can take assignments on the given date.
    ///
    /// An unset window bound imposes no restriction on that side.
    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        if !self.is_available {
            return false;
        }
        if self.available_from.is_some_and(|from| date < from) {
            return false;
        }
        if self.available_to.is_some_and(|to| date > to) {
            return false;
        }
        true
    }

    /// Whether the profile's status admits assignment at all.
    pub fn is_assignable_status(&self) -> bool {
        matches!(
            self.status,
            ReviewerStatus::Certified | ReviewerStatus::LeadQualified
        )
    }
}

/// A declared conflict of interest between a reviewer and an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerCoi {
    pub reviewer_profile_id: ReviewerProfileId,
    pub organization_id: OrganizationId,
    pub is_active: bool,
    pub end_date: Option<NaiveDate>,
}

impl ReviewerCoi {
    /// An active record with no end date, or a future end date, blocks
    /// assignment on `today`.
    pub fn blocks_on(&self, today: NaiveDate) -> bool {
        self.is_active && self.end_date.is_none_or(|end| end > today)
    }
}

/// An approved exception letting a specific reviewer review a specific
/// organization on one specific review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoiOverride {
    pub reviewer_profile_id: ReviewerProfileId,
    pub organization_id: OrganizationId,
    pub review_id: ReviewId,
    pub approved_by: UserId,
    pub revoked: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CoiOverride {
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at.is_none_or(|expires| expires > now)
    }
}

/// Category of a finding raised during the review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingType {
    NonConformity,
    Observation,
    GoodPractice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingSeverity {
    Critical,
    Major,
    Minor,
}

/// Lifecycle state of a corrective action plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapStatus {
    Draft,
    Submitted,
    Accepted,
    Closed,
}

/// A remediation plan attached to a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectiveActionPlan {
    pub status: CapStatus,
}

/// A finding recorded against the host organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: FindingId,
    pub finding_type: FindingType,
    pub severity: FindingSeverity,
    pub cap_required: bool,
    pub cap: Option<CorrectiveActionPlan>,
}

impl Finding {
    /// Whether this finding's CAP completeness gates REPORT_REVIEW → COMPLETED.
    pub fn gates_completion(&self) -> bool {
        self.finding_type == FindingType::NonConformity
            && self.cap_required
            && matches!(
                self.severity,
                FindingSeverity::Critical | FindingSeverity::Major
            )
    }
}

/// Publication state of the review report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Draft,
    InReview,
    Finalized,
    Published,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub status: ReportStatus,
}

impl Report {
    pub fn is_final(&self) -> bool {
        matches!(self.status, ReportStatus::Finalized | ReportStatus::Published)
    }
}

/// The aggregate root of the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub host_organization_id: OrganizationId,
    /// Regional team of the host organization, if it belongs to one.
    pub host_team_id: Option<TeamId>,
    pub status: ReviewStatus,
    pub planned_start_date: Option<NaiveDate>,
    pub planned_end_date: Option<NaiveDate>,
    pub actual_start_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    /// Free-text notes; cancellation reasons are appended here.
    pub notes: String,
}

impl Review {
    /// New review in the REQUESTED state.
    pub fn new(host_organization_id: OrganizationId, host_team_id: Option<TeamId>) -> Self {
        Self {
            id: ReviewId::new(),
            host_organization_id,
            host_team_id,
            status: ReviewStatus::Requested,
            planned_start_date: None,
            planned_end_date: None,
            actual_start_date: None,
            actual_end_date: None,
            notes: String::new(),
        }
    }
}

/// Point-in-time read view of a review and its related entities.
///
/// Guards are pure functions over this snapshot; the executor's
/// compare-and-swap commit guarantees the snapshot was not stale when the
/// status write lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSnapshot {
    pub review: Review,
    pub members: Vec<ReviewTeamMember>,
    pub findings: Vec<Finding>,
    pub report: Option<Report>,
}

impl ReviewSnapshot {
    pub fn new(review: Review) -> Self {
        Self {
            review,
            members: Vec::new(),
            findings: Vec::new(),
            report: None,
        }
    }

    /// Members that have not declined or withdrawn.
    pub fn active_members(&self) -> impl Iterator<Item = &ReviewTeamMember> {
        self.members.iter().filter(|m| m.is_active())
    }

    /// The active lead reviewer, if one is assigned.
    pub fn active_lead(&self) -> Option<&ReviewTeamMember> {
        self.active_members()
            .find(|m| m.role == TeamRole::LeadReviewer)
    }

    pub fn active_member_count(&self) -> usize {
        self.active_members().count()
    }

    pub fn confirmed_member_count(&self) -> usize {
        self.active_members().filter(|m| m.is_confirmed()).count()
    }

    pub fn unconfirmed_member_count(&self) -> usize {
        self.active_members().filter(|m| !m.is_confirmed()).count()
    }
}
