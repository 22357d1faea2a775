//! IN_PROGRESS → REPORT_DRAFTING guard.

use crate::model::ReviewSnapshot;
use crate::policy::WorkflowPolicy;
use crate::validation::{Condition, GuardError, GuardReport, GuardWarning};

/// Drafting starts once the visit's actual end date is recorded. A review
/// with zero findings is unusual but not blocked.
pub(crate) fn to_report_drafting(snapshot: &ReviewSnapshot, _policy: &WorkflowPolicy) -> GuardReport {
    let mut report = GuardReport::new();

    report.check(
        Condition::ActualEndDateRecorded,
        snapshot.review.actual_end_date.is_some(),
        GuardError::ActualEndDateMissing,
    );

    report.warn_if(
        snapshot.findings.is_empty(),
        GuardWarning::NoFindingsRecorded,
    );

    report
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::super::fixtures::{finding, snapshot};
    use super::*;
    use crate::model::{FindingSeverity, FindingType};

    #[test]
    fn test_requires_actual_end_date() {
        let snap = snapshot();
        let report = to_report_drafting(&snap, &WorkflowPolicy::default());
        assert!(report.errors.contains(&GuardError::ActualEndDateMissing));
    }

    #[test]
    fn test_zero_findings_is_a_warning_not_an_error() {
        let mut snap = snapshot();
        snap.review.actual_end_date = Some(Utc::now());

        let report = to_report_drafting(&snap, &WorkflowPolicy::default());
        assert!(report.is_valid());
        assert_eq!(report.warnings, vec![GuardWarning::NoFindingsRecorded]);
    }

    #[test]
    fn test_no_warning_once_findings_exist() {
        let mut snap = snapshot();
        snap.review.actual_end_date = Some(Utc::now());
        snap.findings.push(finding(
            FindingType::Observation,
            FindingSeverity::Minor,
            false,
            None,
        ));

        let report = to_report_drafting(&snap, &WorkflowPolicy::default());
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }
}
