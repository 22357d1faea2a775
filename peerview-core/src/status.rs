//! Lifecycle status and caller identity types.
//!
//! A review moves through a fixed nine-state lifecycle. The status value is
//! only ever mutated by the transition executor; everything else treats it
//! as read-only. Following the principle of "make illegal states
//! unrepresentable", the status is a closed enum and the registry is the
//! single source of truth for which pairs are legal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::UserId;

/// Lifecycle status of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    /// A host organization has requested a review.
    Requested,
    /// The request was approved by programme coordination.
    Approved,
    /// Team composition and scheduling are being worked out.
    Planning,
    /// Team and dates are fixed; the visit has not started.
    Scheduled,
    /// The on-site review is underway.
    InProgress,
    /// The visit ended; the team is drafting the report.
    ReportDrafting,
    /// The draft report is under review by the host and coordination.
    ReportReview,
    /// The review is closed out (terminal).
    Completed,
    /// The review was cancelled (terminal).
    Cancelled,
}

impl ReviewStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [ReviewStatus; 9] = [
        Self::Requested,
        Self::Approved,
        Self::Planning,
        Self::Scheduled,
        Self::InProgress,
        Self::ReportDrafting,
        Self::ReportReview,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Returns true for the two terminal states. Terminal states have no
    /// outgoing entries in the transition registry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Wire/display name, e.g. `IN_PROGRESS`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "REQUESTED",
            Self::Approved => "APPROVED",
            Self::Planning => "PLANNING",
            Self::Scheduled => "SCHEDULED",
            Self::InProgress => "IN_PROGRESS",
            Self::ReportDrafting => "REPORT_DRAFTING",
            Self::ReportReview => "REPORT_REVIEW",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Error returned when parsing an unrecognized status name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown review status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

/// Role of the caller requesting a transition or assignment.
///
/// Roles are supplied by the upstream authorization layer and trusted as-is.
/// The permission table in [`crate::policy`] maps roles to the transitions
/// they may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallerRole {
    Admin,
    /// Programme Coordinator: owns the review programme end to end.
    Coordinator,
    LeadReviewer,
    Reviewer,
}

impl fmt::Display for CallerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Admin => "ADMIN",
            Self::Coordinator => "COORDINATOR",
            Self::LeadReviewer => "LEAD_REVIEWER",
            Self::Reviewer => "REVIEWER",
        };
        f.write_str(name)
    }
}

/// Authenticated caller identity, as handed over by the authorization layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub role: CallerRole,
}

impl Caller {
    pub fn new(user_id: UserId, role: CallerRole) -> Self {
        Self { user_id, role }
    }
}
