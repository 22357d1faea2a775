//! REPORT_DRAFTING → REPORT_REVIEW guard.

use crate::model::{FindingType, ReviewSnapshot};
use crate::policy::WorkflowPolicy;
use crate::validation::{Condition, GuardError, GuardReport, GuardWarning};

/// The draft can go to review once at least one finding is recorded.
///
/// Warnings: non-conformity findings that require a corrective action plan
/// but have none linked yet, and the absence of a report draft. Both become
/// hard requirements later, at REPORT_REVIEW → COMPLETED.
pub(crate) fn to_report_review(snapshot: &ReviewSnapshot, _policy: &WorkflowPolicy) -> GuardReport {
    let mut report = GuardReport::new();

    report.check(
        Condition::FindingsRecorded,
        !snapshot.findings.is_empty(),
        GuardError::NoFindingsRecorded,
    );

    let uncovered = snapshot
        .findings
        .iter()
        .filter(|f| {
            f.finding_type == FindingType::NonConformity && f.cap_required && f.cap.is_none()
        })
        .count();
    report.warn_if(
        uncovered > 0,
        GuardWarning::NonConformitiesWithoutCap { count: uncovered },
    );

    report.warn_if(snapshot.report.is_none(), GuardWarning::NoReportDraft);

    report
}
