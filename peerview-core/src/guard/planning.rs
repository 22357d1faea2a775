//! PLANNING → SCHEDULED guard.

use crate::model::ReviewSnapshot;
use crate::policy::WorkflowPolicy;
use crate::validation::{Condition, GuardError, GuardReport, GuardWarning};

/// A review may be scheduled once a lead reviewer is assigned, the team has
/// the minimum number of members, and both planned dates are set.
///
/// Warnings (non-blocking): team smaller than the recommended size, or
/// members that have not yet confirmed.
pub(crate) fn to_scheduled(snapshot: &ReviewSnapshot, policy: &WorkflowPolicy) -> GuardReport {
    let mut report = GuardReport::new();

    report.check(
        Condition::LeadReviewerAssigned,
        snapshot.active_lead().is_some(),
        GuardError::LeadReviewerNotAssigned,
    );

    let count = snapshot.active_member_count();
    report.check(
        Condition::MinimumTeamSize,
        count >= policy.min_team_members,
        GuardError::InsufficientTeamMembers {
            count,
            required: policy.min_team_members,
        },
    );

    let start_set = snapshot.review.planned_start_date.is_some();
    let end_set = snapshot.review.planned_end_date.is_some();
    report.condition(Condition::PlannedDatesSet, start_set && end_set);
    if !start_set {
        report.error(GuardError::PlannedStartDateMissing);
    }
    if !end_set {
        report.error(GuardError::PlannedEndDateMissing);
    }

    report.warn_if(
        count < policy.recommended_team_members,
        GuardWarning::SmallTeam {
            count,
            recommended: policy.recommended_team_members,
        },
    );
    let unconfirmed = snapshot.unconfirmed_member_count();
    report.warn_if(
        unconfirmed > 0,
        GuardWarning::UnconfirmedMembers { count: unconfirmed },
    );

    report
}
