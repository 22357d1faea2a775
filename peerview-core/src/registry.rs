//! The transition registry: the legal `(from, to)` pairs as data.
//!
//! Every legal lifecycle transition is one [`TransitionSpec`] row: the pair,
//! the permitted caller roles (referencing the shared permission groups in
//! [`crate::policy`]), the declared guard conditions, and the guard
//! function. The registry is built once, process-wide, and never mutated.
//! Keeping the graph as a table makes it inspectable and testable
//! independently of execution.

use std::sync::OnceLock;

use serde::Serialize;

use crate::guard;
use crate::model::ReviewSnapshot;
use crate::policy::{WorkflowPolicy, COORDINATION_ROLES, EXECUTION_ROLES};
use crate::status::{CallerRole, ReviewStatus};
use crate::validation::{Condition, GuardReport};

/// Pure guard function over a loaded snapshot.
pub type GuardFn = fn(&ReviewSnapshot, &WorkflowPolicy) -> GuardReport;

/// One legal transition.
pub struct TransitionSpec {
    pub from: ReviewStatus,
    pub to: ReviewStatus,
    /// Roles allowed to invoke this transition.
    pub roles: &'static [CallerRole],
    /// Conditions the guard evaluates, in checklist order.
    pub conditions: &'static [Condition],
    pub guard: GuardFn,
    /// Whether the caller is expected to supply a free-text reason
    /// (advisory; appended to notes on apply).
    pub requires_reason: bool,
}

impl TransitionSpec {
    pub fn permits(&self, role: CallerRole) -> bool {
        self.roles.contains(&role)
    }
}

/// The static table of legal transitions.
pub struct TransitionRegistry {
    entries: Vec<TransitionSpec>,
}

impl TransitionRegistry {
    fn build() -> Self {
        use ReviewStatus::*;

        let row = |from, to, roles, conditions, guard: GuardFn, requires_reason| TransitionSpec {
            from,
            to,
            roles,
            conditions,
            guard,
            requires_reason,
        };

        let entries = vec![
            // Intake: pure authorization decisions.
            row(Requested, Approved, COORDINATION_ROLES, &[], guard::none, false),
            row(Requested, Cancelled, COORDINATION_ROLES, &[], guard::none, true),
            row(Approved, Planning, COORDINATION_ROLES, &[], guard::none, false),
            // Planning and execution.
            row(
                Planning,
                Scheduled,
                COORDINATION_ROLES,
                &[
                    Condition::LeadReviewerAssigned,
                    Condition::MinimumTeamSize,
                    Condition::PlannedDatesSet,
                ],
                guard::to_scheduled,
                false,
            ),
            row(
                Scheduled,
                InProgress,
                EXECUTION_ROLES,
                &[
                    Condition::ActualStartDateRecorded,
                    Condition::LeadReviewerConfirmed,
                    Condition::ConfirmedTeamSize,
                ],
                guard::to_in_progress,
                false,
            ),
            row(
                InProgress,
                ReportDrafting,
                EXECUTION_ROLES,
                &[Condition::ActualEndDateRecorded],
                guard::to_report_drafting,
                false,
            ),
            row(
                ReportDrafting,
                ReportReview,
                EXECUTION_ROLES,
                &[Condition::FindingsRecorded],
                guard::to_report_review,
                false,
            ),
            row(
                ReportReview,
                Completed,
                COORDINATION_ROLES,
                &[
                    Condition::ReportExists,
                    Condition::CapCoverage,
                    Condition::CapsFinalized,
                ],
                guard::to_completed,
                false,
            ),
            // Cancellation from every pre-visit state.
            row(Approved, Cancelled, COORDINATION_ROLES, &[], guard::none, true),
            row(Planning, Cancelled, COORDINATION_ROLES, &[], guard::none, true),
            row(Scheduled, Cancelled, COORDINATION_ROLES, &[], guard::none, true),
        ];

        Self { entries }
    }

    /// Registry entry for a `(from, to)` pair, if the pair is legal.
    pub fn get(&self, from: ReviewStatus, to: ReviewStatus) -> Option<&TransitionSpec> {
        self.entries.iter().find(|t| t.from == from && t.to == to)
    }

    /// Legal target statuses from `from`. Empty for terminal states.
    pub fn valid_transitions_from(&self, from: ReviewStatus) -> Vec<ReviewStatus> {
        self.entries
            .iter()
            .filter(|t| t.from == from)
            .map(|t| t.to)
            .collect()
    }

    pub fn entries(&self) -> &[TransitionSpec] {
        &self.entries
    }

    /// The full lifecycle graph, for rendering a status-flow diagram.
    pub fn status_flow(&self) -> Vec<StatusFlowEntry> {
        ReviewStatus::ALL
            .iter()
            .map(|&status| StatusFlowEntry {
                status,
                next: self.valid_transitions_from(status),
                terminal: status.is_terminal(),
            })
            .collect()
    }
}

/// One node of the lifecycle graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusFlowEntry {
    pub status: ReviewStatus,
    pub next: Vec<ReviewStatus>,
    pub terminal: bool,
}

/// The process-wide registry, built on first use.
pub fn registry() -> &'static TransitionRegistry {
    static REGISTRY: OnceLock<TransitionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(TransitionRegistry::build)
}
