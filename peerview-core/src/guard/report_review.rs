//! REPORT_REVIEW → COMPLETED guard.

use crate::model::ReviewSnapshot;
use crate::policy::WorkflowPolicy;
use crate::validation::{Condition, GuardError, GuardReport, GuardWarning};

/// Completion requires a report to exist and corrective action plans to be
/// complete: every critical/major non-conformity that requires a CAP must
/// have one linked, and none of those CAPs may still be in draft.
///
/// A report that exists but is not yet finalized/published only warns; a
/// coordinator may close out a review ahead of report publication.
pub(crate) fn to_completed(snapshot: &ReviewSnapshot, _policy: &WorkflowPolicy) -> GuardReport {
    let mut report = GuardReport::new();

    match &snapshot.report {
        None => {
            report.condition(Condition::ReportExists, false);
            report.error(GuardError::ReportMissing);
        }
        Some(r) => {
            report.condition(Condition::ReportExists, true);
            report.warn_if(
                !r.is_final(),
                GuardWarning::ReportNotFinalized { status: r.status },
            );
        }
    }

    let gating: Vec<_> = snapshot
        .findings
        .iter()
        .filter(|f| f.gates_completion())
        .collect();

    let missing = gating.iter().filter(|f| f.cap.is_none()).count();
    report.check(
        Condition::CapCoverage,
        missing == 0,
        GuardError::FindingsMissingCap { count: missing },
    );

    let drafts = gating
        .iter()
        .filter(|f| {
            f.cap
                .as_ref()
                .is_some_and(|cap| cap.status == crate::model::CapStatus::Draft)
        })
        .count();
    report.check(
        Condition::CapsFinalized,
        drafts == 0,
        GuardError::CapsInDraft { count: drafts },
    );

    report
}
