//! Structured guard results.
//!
//! Every transition guard returns a [`GuardReport`]: the full list of
//! blocking errors, non-blocking warnings, and a `(condition, met)` pair for
//! each of the transition's declared conditions. Validators never
//! short-circuit, so a caller always sees the complete checklist. Condition
//! attribution is structural — a condition is marked unmet by the check that
//! evaluated it, never inferred from error-message text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ReportStatus;

/// Stable identifier for a named guard condition.
///
/// The registry declares which conditions apply to each transition; guards
/// report each one as met or unmet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    LeadReviewerAssigned,
    MinimumTeamSize,
    PlannedDatesSet,
    ActualStartDateRecorded,
    LeadReviewerConfirmed,
    ConfirmedTeamSize,
    ActualEndDateRecorded,
    FindingsRecorded,
    CapCoverage,
    CapsFinalized,
    ReportExists,
}

impl Condition {
    /// Human-readable label for checklist rendering.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LeadReviewerAssigned => "Lead Reviewer assigned",
            Self::MinimumTeamSize => "Minimum team size met",
            Self::PlannedDatesSet => "Planned start and end dates set",
            Self::ActualStartDateRecorded => "Actual start date recorded",
            Self::LeadReviewerConfirmed => "Lead Reviewer confirmed",
            Self::ConfirmedTeamSize => "Minimum confirmed members met",
            Self::ActualEndDateRecorded => "Actual end date recorded",
            Self::FindingsRecorded => "At least one finding recorded",
            Self::CapCoverage => "Corrective action plans linked to qualifying findings",
            Self::CapsFinalized => "No corrective action plan left in draft",
            Self::ReportExists => "Report exists",
        }
    }
}

/// One entry of the rendered condition checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionStatus {
    pub condition: Condition,
    pub met: bool,
}

/// A blocking guard failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardError {
    LeadReviewerNotAssigned,
    InsufficientTeamMembers { count: usize, required: usize },
    PlannedStartDateMissing,
    PlannedEndDateMissing,
    ActualStartDateMissing,
    LeadReviewerNotConfirmed,
    InsufficientConfirmedMembers { count: usize, required: usize },
    ActualEndDateMissing,
    NoFindingsRecorded,
    FindingsMissingCap { count: usize },
    CapsInDraft { count: usize },
    ReportMissing,
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeadReviewerNotAssigned => write!(f, "Lead Reviewer must be assigned"),
            Self::InsufficientTeamMembers { required, .. } => {
                write!(f, "Minimum {required} team members required")
            }
            Self::PlannedStartDateMissing => write!(f, "Planned start date must be set"),
            Self::PlannedEndDateMissing => write!(f, "Planned end date must be set"),
            Self::ActualStartDateMissing => write!(f, "Actual start date must be recorded"),
            Self::LeadReviewerNotConfirmed => {
                write!(f, "Lead Reviewer must have confirmed participation")
            }
            Self::InsufficientConfirmedMembers { required, .. } => {
                write!(f, "Minimum {required} confirmed team members required")
            }
            Self::ActualEndDateMissing => write!(f, "Actual end date must be recorded"),
            Self::NoFindingsRecorded => write!(f, "At least one finding must be recorded"),
            Self::FindingsMissingCap { count } => write!(
                f,
                "{count} non-conformity finding(s) require a corrective action plan"
            ),
            Self::CapsInDraft { count } => write!(
                f,
                "{count} corrective action plan(s) are still in draft status"
            ),
            Self::ReportMissing => write!(f, "A report must exist before completion"),
        }
    }
}

/// A non-blocking guard warning, surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardWarning {
    SmallTeam { count: usize, recommended: usize },
    UnconfirmedMembers { count: usize },
    NoFindingsRecorded,
    NonConformitiesWithoutCap { count: usize },
    NoReportDraft,
    ReportNotFinalized { status: ReportStatus },
}

impl fmt::Display for GuardWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SmallTeam { count, recommended } => write!(
                f,
                "Team has {count} members; {recommended} or more are recommended"
            ),
            Self::UnconfirmedMembers { count } => {
                write!(f, "{count} team member(s) have not confirmed participation")
            }
            Self::NoFindingsRecorded => write!(f, "No findings were recorded during the review"),
            Self::NonConformitiesWithoutCap { count } => write!(
                f,
                "{count} non-conformity finding(s) requiring a corrective action plan have none linked"
            ),
            Self::NoReportDraft => write!(f, "No report draft exists yet"),
            Self::ReportNotFinalized { status } => {
                write!(f, "Report is not finalized (current status: {status:?})")
            }
        }
    }
}

/// The complete result of running one transition guard.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GuardReport {
    pub errors: Vec<GuardError>,
    pub warnings: Vec<GuardWarning>,
    pub conditions: Vec<ConditionStatus>,
}

impl GuardReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a condition's outcome without an associated error.
    pub fn condition(&mut self, condition: Condition, met: bool) {
        self.conditions.push(ConditionStatus { condition, met });
    }

    /// Record a condition and, when unmet, the error that explains it.
    pub fn check(&mut self, condition: Condition, met: bool, error: GuardError) {
        self.condition(condition, met);
        if !met {
            self.errors.push(error);
        }
    }

    pub fn error(&mut self, error: GuardError) {
        self.errors.push(error);
    }

    pub fn warn_if(&mut self, applies: bool, warning: GuardWarning) {
        if applies {
            self.warnings.push(warning);
        }
    }

    /// A guard passes iff it produced no blocking errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_marks_condition_and_collects_error() {
        let mut report = GuardReport::new();
        report.check(
            Condition::LeadReviewerAssigned,
            false,
            GuardError::LeadReviewerNotAssigned,
        );
        report.check(
            Condition::MinimumTeamSize,
            true,
            GuardError::InsufficientTeamMembers {
                count: 3,
                required: 2,
            },
        );

        assert!(!report.is_valid());
        assert_eq!(report.errors, vec![GuardError::LeadReviewerNotAssigned]);
        assert_eq!(
            report.conditions,
            vec![
                ConditionStatus {
                    condition: Condition::LeadReviewerAssigned,
                    met: false
                },
                ConditionStatus {
                    condition: Condition::MinimumTeamSize,
                    met: true
                },
            ]
        );
    }

    #[test]
    fn test_warnings_do_not_block() {
        let mut report = GuardReport::new();
        report.warn_if(true, GuardWarning::NoFindingsRecorded);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_exact_messages_for_planning_guard_errors() {
        assert_eq!(
            GuardError::LeadReviewerNotAssigned.to_string(),
            "Lead Reviewer must be assigned"
        );
        assert_eq!(
            GuardError::InsufficientTeamMembers {
                count: 1,
                required: 2
            }
            .to_string(),
            "Minimum 2 team members required"
        );
    }
}
