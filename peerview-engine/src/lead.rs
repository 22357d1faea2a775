//! Lead-reviewer qualification and assignment.
//!
//! Stricter than ordinary assignment: qualification, experience, both
//! conflict-of-interest checks and single-lead uniqueness are all evaluated
//! and accumulated, so the caller sees every failing condition at once.
//! `can_override` marks the decisions a Programme Coordinator may waive;
//! conflict-of-interest and an occupied lead seat are never waivable.

use std::fmt;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use peerview_core::model::{
    ReviewId, ReviewTeamMember, ReviewerProfile, ReviewerProfileId, ReviewerStatus, TeamMemberId,
    TeamRole,
};

use crate::eligibility::AssignmentEngine;
use crate::repository::MemberInsert;
use crate::EngineError;

/// A blocking lead-assignment failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LeadAssignmentError {
    ReviewNotFound,
    ReviewerNotFound,
    NotLeadQualified,
    InsufficientExperience { completed: u32, required: u32 },
    /// The reviewer's effective organization is the host organization.
    HostOrganizationConflict,
    /// An active declared conflict of interest with no approved override.
    ActiveConflictOfInterest,
    LeadAlreadyAssigned,
}

impl LeadAssignmentError {
    /// Whether a coordinator exception may waive this failure.
    fn is_overridable(&self) -> bool {
        matches!(
            self,
            Self::NotLeadQualified | Self::InsufficientExperience { .. }
        )
    }
}

impl fmt::Display for LeadAssignmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReviewNotFound => write!(f, "Review not found"),
            Self::ReviewerNotFound => write!(f, "Reviewer not found"),
            Self::NotLeadQualified => {
                write!(f, "Reviewer is not qualified as a Lead Reviewer")
            }
            Self::InsufficientExperience { completed, required } => write!(
                f,
                "Reviewer has completed {completed} reviews; {required} are required to lead"
            ),
            Self::HostOrganizationConflict => write!(
                f,
                "Reviewer belongs to the host organization and cannot lead its review"
            ),
            Self::ActiveConflictOfInterest => write!(
                f,
                "Reviewer has an active conflict of interest with the host organization"
            ),
            Self::LeadAlreadyAssigned => {
                write!(f, "Another Lead Reviewer is already assigned to this review")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LeadAssignmentWarning {
    /// An active conflict exists but an approved override covers this exact
    /// reviewer, organization and review.
    CoiOverrideApproved,
}

impl fmt::Display for LeadAssignmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoiOverrideApproved => {
                write!(f, "Conflict of interest present; an approved override applies")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadAssignmentOptions {
    /// Skip the single-lead uniqueness check (replacement flows that remove
    /// the old lead separately).
    pub skip_existing_lead_check: bool,
    /// Membership row being replaced; excluded from the uniqueness check.
    pub replacing_member_id: Option<TeamMemberId>,
}

/// Complete outcome of validating a lead assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadAssignmentDecision {
    pub valid: bool,
    pub errors: Vec<LeadAssignmentError>,
    pub warnings: Vec<LeadAssignmentWarning>,
    /// True only when every collected error is individually waivable.
    pub can_override: bool,
    pub profile: Option<ReviewerProfile>,
}

impl LeadAssignmentDecision {
    fn from_errors(
        errors: Vec<LeadAssignmentError>,
        warnings: Vec<LeadAssignmentWarning>,
        profile: Option<ReviewerProfile>,
    ) -> Self {
        let can_override =
            !errors.is_empty() && errors.iter().all(LeadAssignmentError::is_overridable);
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            can_override,
            profile,
        }
    }
}

/// One named requirement in a qualification summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualificationRequirement {
    pub name: &'static str,
    pub met: bool,
    pub detail: String,
}

/// Read-only progress summary towards lead qualification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadQualificationStatus {
    pub requirements: Vec<QualificationRequirement>,
    pub qualified: bool,
}

/// Outcome of a lead-assignment commit.
#[derive(Debug, Clone, PartialEq)]
pub enum LeadAssignmentResult {
    Assigned {
        member: ReviewTeamMember,
        warnings: Vec<LeadAssignmentWarning>,
    },
    Rejected(LeadAssignmentDecision),
}

impl AssignmentEngine {
    /// Validate a lead assignment. All guards run; nothing short-circuits.
    pub async fn validate_lead_assignment(
        &self,
        reviewer_profile_id: &ReviewerProfileId,
        review_id: &ReviewId,
        options: &LeadAssignmentOptions,
    ) -> Result<LeadAssignmentDecision, EngineError> {
        let snapshot = self.reviews.snapshot(review_id).await?;
        let profile = self.reviewers.profile(reviewer_profile_id).await?;

        let snapshot_missing = snapshot.is_none();
        let profile_missing = profile.is_none();
        let (Some(snapshot), Some(profile)) = (snapshot, profile) else {
            let mut errors = Vec::new();
            if snapshot_missing {
                errors.push(LeadAssignmentError::ReviewNotFound);
            }
            if profile_missing {
                errors.push(LeadAssignmentError::ReviewerNotFound);
            }
            return Ok(LeadAssignmentDecision::from_errors(errors, Vec::new(), None));
        };

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if !(profile.is_lead_qualified || profile.status == ReviewerStatus::LeadQualified) {
            errors.push(LeadAssignmentError::NotLeadQualified);
        }

        let required = self.policy.min_reviews_for_lead;
        if profile.reviews_completed < required {
            errors.push(LeadAssignmentError::InsufficientExperience {
                completed: profile.reviews_completed,
                required,
            });
        }

        let host_org = snapshot.review.host_organization_id;
        if profile.effective_organization() == host_org {
            errors.push(LeadAssignmentError::HostOrganizationConflict);
        }

        let now = Utc::now();
        let conflicts = self
            .cois
            .active_conflicts(reviewer_profile_id, &host_org)
            .await?;
        if conflicts.iter().any(|c| c.blocks_on(now.date_naive())) {
            let override_applies = self
                .cois
                .approved_override(reviewer_profile_id, &host_org, review_id)
                .await?
                .is_some_and(|o| o.is_effective(now));
            if override_applies {
                warnings.push(LeadAssignmentWarning::CoiOverrideApproved);
            } else {
                errors.push(LeadAssignmentError::ActiveConflictOfInterest);
            }
        }

        if !options.skip_existing_lead_check {
            let other_lead = snapshot.members.iter().any(|m| {
                m.role == TeamRole::LeadReviewer
                    && m.is_active()
                    && Some(m.id) != options.replacing_member_id
                    && m.reviewer_profile_id != *reviewer_profile_id
            });
            if other_lead {
                errors.push(LeadAssignmentError::LeadAlreadyAssigned);
            }
        }

        Ok(LeadAssignmentDecision::from_errors(
            errors,
            warnings,
            Some(profile),
        ))
    }

    /// Read-only qualification summary for progress display.
    pub async fn lead_qualification_status(
        &self,
        reviewer_profile_id: &ReviewerProfileId,
    ) -> Result<LeadQualificationStatus, EngineError> {
        let profile = self
            .reviewers
            .profile(reviewer_profile_id)
            .await?
            .ok_or(EngineError::ReviewerNotFound(*reviewer_profile_id))?;

        let required = self.policy.min_reviews_for_lead;
        let status_met = profile.status == ReviewerStatus::LeadQualified;
        let experience_met = profile.reviews_completed >= required;

        let requirements = vec![
            QualificationRequirement {
                name: "Lead status",
                met: status_met,
                detail: format!("Current status: {:?}", profile.status),
            },
            QualificationRequirement {
                name: "Minimum completed reviews",
                met: experience_met,
                detail: format!(
                    "{} of {} completed reviews",
                    profile.reviews_completed, required
                ),
            },
            QualificationRequirement {
                name: "Active lead certification",
                met: profile.is_lead_qualified,
                detail: if profile.is_lead_qualified {
                    "Lead certification active".to_string()
                } else {
                    "Lead certification not granted".to_string()
                },
            },
        ];

        let qualified = (profile.is_lead_qualified || status_met) && experience_met;

        Ok(LeadQualificationStatus {
            requirements,
            qualified,
        })
    }

    /// Validate and commit a lead assignment.
    ///
    /// The repository insert re-checks lead uniqueness atomically, so two
    /// concurrent callers cannot both seat a lead: the loser is rejected
    /// even though its validation passed.
    pub async fn assign_lead_reviewer(
        &self,
        reviewer_profile_id: &ReviewerProfileId,
        review_id: &ReviewId,
        options: &LeadAssignmentOptions,
    ) -> Result<LeadAssignmentResult, EngineError> {
        let decision = self
            .validate_lead_assignment(reviewer_profile_id, review_id, options)
            .await?;
        if !decision.valid {
            return Ok(LeadAssignmentResult::Rejected(decision));
        }

        let member =
            ReviewTeamMember::new(*review_id, *reviewer_profile_id, TeamRole::LeadReviewer);
        match self
            .reviews
            .insert_lead_member(member, options.replacing_member_id)
            .await?
        {
            MemberInsert::Inserted(member) => {
                info!(
                    review_id = %review_id,
                    reviewer = %reviewer_profile_id,
                    "lead reviewer assigned"
                );
                Ok(LeadAssignmentResult::Assigned {
                    member,
                    warnings: decision.warnings,
                })
            }
            MemberInsert::LeadSeatTaken => Ok(LeadAssignmentResult::Rejected(
                LeadAssignmentDecision::from_errors(
                    vec![LeadAssignmentError::LeadAlreadyAssigned],
                    decision.warnings,
                    decision.profile,
                ),
            )),
            MemberInsert::ReviewNotFound => Ok(LeadAssignmentResult::Rejected(
                LeadAssignmentDecision::from_errors(
                    vec![LeadAssignmentError::ReviewNotFound],
                    decision.warnings,
                    decision.profile,
                ),
            )),
        }
    }
}
