//! SCHEDULED → IN_PROGRESS guard.

use crate::model::ReviewSnapshot;
use crate::policy::WorkflowPolicy;
use crate::validation::{Condition, GuardError, GuardReport};

/// The visit may start once the actual start date is recorded, the lead
/// reviewer exists and has confirmed, and enough members have confirmed.
pub(crate) fn to_in_progress(snapshot: &ReviewSnapshot, policy: &WorkflowPolicy) -> GuardReport {
    let mut report = GuardReport::new();

    report.check(
        Condition::ActualStartDateRecorded,
        snapshot.review.actual_start_date.is_some(),
        GuardError::ActualStartDateMissing,
    );

    // The lead must both exist and be confirmed; absence and
    // non-confirmation are distinct errors under one condition.
    let lead = snapshot.active_lead();
    let lead_confirmed = lead.is_some_and(|m| m.is_confirmed());
    report.condition(Condition::LeadReviewerConfirmed, lead_confirmed);
    match lead {
        None => report.error(GuardError::LeadReviewerNotAssigned),
        Some(m) if !m.is_confirmed() => report.error(GuardError::LeadReviewerNotConfirmed),
        Some(_) => {}
    }

    let confirmed = snapshot.confirmed_member_count();
    report.check(
        Condition::ConfirmedTeamSize,
        confirmed >= policy.min_confirmed_members,
        GuardError::InsufficientConfirmedMembers {
            count: confirmed,
            required: policy.min_confirmed_members,
        },
    );

    report
}
