//! Transition validation and execution.
//!
//! [`WorkflowEngine`] is the only path by which a review's status changes.
//! `can_transition` produces a full decision (errors, warnings and the
//! condition checklist) without side effects; `execute_transition`
//! re-validates against current state and commits through the repository's
//! compare-and-swap, so a decision computed against a stale read is rejected
//! as an ordinary validation failure rather than silently overwriting a
//! concurrent change.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use peerview_core::model::{Review, ReviewId};
use peerview_core::registry::{registry, StatusFlowEntry};
use peerview_core::status::{Caller, CallerRole, ReviewStatus};
use peerview_core::validation::{ConditionStatus, GuardError, GuardWarning};
use peerview_core::WorkflowPolicy;

use crate::repository::{ReviewRepository, StatusUpdate, StatusUpdateResult};
use crate::EngineError;

/// Why a requested transition was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TransitionError {
    ReviewNotFound,
    /// The `(from, to)` pair has no registry entry.
    InvalidTransition {
        from: ReviewStatus,
        to: ReviewStatus,
        /// Legal targets from `from`; empty when `from` is terminal.
        valid: Vec<ReviewStatus>,
    },
    RoleNotPermitted {
        required: Vec<CallerRole>,
    },
    Guard(GuardError),
    /// The stored status changed between validation and commit.
    ConcurrentModification {
        expected: ReviewStatus,
        actual: ReviewStatus,
    },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReviewNotFound => write!(f, "Review not found"),
            Self::InvalidTransition { from, to, valid } => {
                if valid.is_empty() {
                    write!(f, "Cannot transition from {from} to {to}: {from} is terminal")
                } else {
                    let targets: Vec<_> = valid.iter().map(ReviewStatus::as_str).collect();
                    write!(
                        f,
                        "Cannot transition from {from} to {to}; valid transitions are: {}",
                        targets.join(", ")
                    )
                }
            }
            Self::RoleNotPermitted { required } => {
                let roles: Vec<_> = required.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "This transition requires one of the following roles: {}",
                    roles.join(", ")
                )
            }
            Self::Guard(e) => e.fmt(f),
            Self::ConcurrentModification { expected, actual } => write!(
                f,
                "Review status changed concurrently (validated against {expected}, found {actual})"
            ),
        }
    }
}

/// Full outcome of validating one requested transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionDecision {
    pub allowed: bool,
    pub errors: Vec<TransitionError>,
    pub warnings: Vec<GuardWarning>,
    /// Checklist of the transition's declared conditions, when a registry
    /// entry was found; empty otherwise.
    pub conditions: Vec<ConditionStatus>,
}

impl TransitionDecision {
    fn rejected(error: TransitionError) -> Self {
        Self {
            allowed: false,
            errors: vec![error],
            warnings: Vec::new(),
            conditions: Vec::new(),
        }
    }
}

/// One target a caller could move a review to, with its guard checklist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableTransition {
    pub to: ReviewStatus,
    /// Whether the guard currently passes.
    pub allowed: bool,
    pub conditions: Vec<ConditionStatus>,
    pub requires_reason: bool,
}

/// Caller-supplied context for a transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionMetadata {
    /// Free-text reason, appended to the review's notes on cancellation.
    pub reason: Option<String>,
}

/// Outcome of `execute_transition`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Applied {
        review: Review,
        previous: ReviewStatus,
        warnings: Vec<GuardWarning>,
    },
    Rejected(TransitionDecision),
}

pub struct WorkflowEngine {
    reviews: Arc<dyn ReviewRepository>,
    policy: WorkflowPolicy,
}

impl WorkflowEngine {
    pub fn new(reviews: Arc<dyn ReviewRepository>, policy: WorkflowPolicy) -> Self {
        Self { reviews, policy }
    }

    /// Legal target statuses from `from`. Pure registry lookup.
    pub fn valid_transitions_from(&self, from: ReviewStatus) -> Vec<ReviewStatus> {
        registry().valid_transitions_from(from)
    }

    /// The full lifecycle graph, for rendering a status-flow diagram.
    pub fn status_flow(&self) -> Vec<StatusFlowEntry> {
        registry().status_flow()
    }

    /// Validate a transition without applying it.
    ///
    /// A missing review is reported inside the decision, not as an error
    /// channel, so callers see one uniform failure shape.
    pub async fn can_transition(
        &self,
        review_id: &ReviewId,
        target: ReviewStatus,
        role: CallerRole,
    ) -> Result<TransitionDecision, EngineError> {
        let Some(snapshot) = self.reviews.snapshot(review_id).await? else {
            return Ok(TransitionDecision::rejected(TransitionError::ReviewNotFound));
        };
        Ok(self.decide(&snapshot, target, role))
    }

    /// Transitions available from the review's current status for the given
    /// role, each with its current condition checklist.
    pub async fn available_transitions(
        &self,
        review_id: &ReviewId,
        role: CallerRole,
    ) -> Result<Vec<AvailableTransition>, EngineError> {
        let snapshot = self
            .reviews
            .snapshot(review_id)
            .await?
            .ok_or(EngineError::ReviewNotFound(*review_id))?;

        let available = registry()
            .entries()
            .iter()
            .filter(|spec| spec.from == snapshot.review.status && spec.permits(role))
            .map(|spec| {
                let report = (spec.guard)(&snapshot, &self.policy);
                AvailableTransition {
                    to: spec.to,
                    allowed: report.is_valid(),
                    conditions: report.conditions,
                    requires_reason: spec.requires_reason,
                }
            })
            .collect();
        Ok(available)
    }

    /// Re-validate and apply a transition on behalf of `caller`.
    ///
    /// The commit is conditional on the status the validation ran against;
    /// a concurrent status change surfaces as a rejection, never a lost
    /// update.
    pub async fn execute_transition(
        &self,
        review_id: &ReviewId,
        target: ReviewStatus,
        caller: &Caller,
        metadata: TransitionMetadata,
    ) -> Result<ExecutionResult, EngineError> {
        let Some(snapshot) = self.reviews.snapshot(review_id).await? else {
            return Ok(ExecutionResult::Rejected(TransitionDecision::rejected(
                TransitionError::ReviewNotFound,
            )));
        };

        let decision = self.decide(&snapshot, target, caller.role);
        if !decision.allowed {
            return Ok(ExecutionResult::Rejected(decision));
        }

        let validated = snapshot.review.status;
        let update = build_update(&snapshot.review, target, &metadata);

        match self.reviews.update_status(review_id, validated, update).await? {
            StatusUpdateResult::Updated(review) => {
                info!(
                    review_id = %review_id,
                    caller = %caller.user_id,
                    role = %caller.role,
                    from = %validated,
                    to = %target,
                    "review transition applied"
                );
                Ok(ExecutionResult::Applied {
                    review,
                    previous: validated,
                    warnings: decision.warnings,
                })
            }
            StatusUpdateResult::Conflict { actual } => {
                warn!(
                    review_id = %review_id,
                    caller = %caller.user_id,
                    expected = %validated,
                    actual = %actual,
                    "transition lost a concurrent status race"
                );
                Ok(ExecutionResult::Rejected(TransitionDecision::rejected(
                    TransitionError::ConcurrentModification {
                        expected: validated,
                        actual,
                    },
                )))
            }
            StatusUpdateResult::NotFound => Ok(ExecutionResult::Rejected(
                TransitionDecision::rejected(TransitionError::ReviewNotFound),
            )),
        }
    }

    fn decide(
        &self,
        snapshot: &peerview_core::model::ReviewSnapshot,
        target: ReviewStatus,
        role: CallerRole,
    ) -> TransitionDecision {
        let from = snapshot.review.status;
        let Some(spec) = registry().get(from, target) else {
            return TransitionDecision::rejected(TransitionError::InvalidTransition {
                from,
                to: target,
                valid: registry().valid_transitions_from(from),
            });
        };

        if !spec.permits(role) {
            return TransitionDecision::rejected(TransitionError::RoleNotPermitted {
                required: spec.roles.to_vec(),
            });
        }

        let report = (spec.guard)(snapshot, &self.policy);
        TransitionDecision {
            allowed: report.is_valid(),
            errors: report.errors.into_iter().map(TransitionError::Guard).collect(),
            warnings: report.warnings,
            conditions: report.conditions,
        }
    }
}

/// Build the conditional write for an approved transition.
///
/// The guards for IN_PROGRESS and REPORT_DRAFTING already require their
/// dates to be set, so on those paths the stamp branches stay idle; they
/// exist for repositories whose stored review can lack a date the guard
/// did not see.
fn build_update(review: &Review, target: ReviewStatus, metadata: &TransitionMetadata) -> StatusUpdate {
    let mut update = StatusUpdate::to_status(target);
    if target == ReviewStatus::InProgress && review.actual_start_date.is_none() {
        update.actual_start_date = Some(Utc::now());
    }
    if target == ReviewStatus::ReportDrafting && review.actual_end_date.is_none() {
        update.actual_end_date = Some(Utc::now());
    }
    if target == ReviewStatus::Cancelled {
        if let Some(reason) = &metadata.reason {
            update.append_note = Some(format!("Cancelled: {reason}"));
        }
    }
    update
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use peerview_core::model::{
        OrganizationId, Review, ReviewSnapshot, ReviewTeamMember, TeamMemberId, UserId,
    };

    use super::*;
    use crate::repository::{InMemoryStore, MemberInsert, RepositoryError};

    fn engine(store: Arc<InMemoryStore>) -> WorkflowEngine {
        WorkflowEngine::new(store, WorkflowPolicy::default())
    }

    fn caller(role: CallerRole) -> Caller {
        Caller::new(UserId::new(), role)
    }

    async fn seeded_review(store: &InMemoryStore, status: ReviewStatus) -> ReviewId {
        let mut review = Review::new(OrganizationId::new(), None);
        review.status = status;
        let id = review.id;
        store.insert_review(review).await;
        id
    }

    #[tokio::test]
    async fn test_missing_review_is_an_ordinary_rejection() {
        let store = Arc::new(InMemoryStore::new());
        let decision = engine(store)
            .can_transition(
                &ReviewId::new(),
                ReviewStatus::Approved,
                CallerRole::Coordinator,
            )
            .await
            .unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.errors, vec![TransitionError::ReviewNotFound]);
    }

    #[tokio::test]
    async fn test_illegal_pair_lists_the_legal_targets() {
        let store = Arc::new(InMemoryStore::new());
        let id = seeded_review(&store, ReviewStatus::Requested).await;

        let decision = engine(store)
            .can_transition(&id, ReviewStatus::Planning, CallerRole::Admin)
            .await
            .unwrap();

        assert!(!decision.allowed);
        match &decision.errors[..] {
            [TransitionError::InvalidTransition { from, to, valid }] => {
                assert_eq!(*from, ReviewStatus::Requested);
                assert_eq!(*to, ReviewStatus::Planning);
                assert_eq!(valid, &[ReviewStatus::Approved, ReviewStatus::Cancelled]);
            }
            other => panic!("unexpected errors: {other:?}"),
        }
        let message = decision.errors[0].to_string();
        assert_eq!(
            message,
            "Cannot transition from REQUESTED to PLANNING; valid transitions are: APPROVED, CANCELLED"
        );
    }

    #[tokio::test]
    async fn test_role_check_names_the_required_roles() {
        let store = Arc::new(InMemoryStore::new());
        let id = seeded_review(&store, ReviewStatus::Requested).await;

        let decision = engine(store)
            .can_transition(&id, ReviewStatus::Approved, CallerRole::Reviewer)
            .await
            .unwrap();

        assert_eq!(
            decision.errors,
            vec![TransitionError::RoleNotPermitted {
                required: vec![CallerRole::Admin, CallerRole::Coordinator],
            }]
        );
        assert_eq!(
            decision.errors[0].to_string(),
            "This transition requires one of the following roles: ADMIN, COORDINATOR"
        );
    }

    #[tokio::test]
    async fn test_guard_errors_and_conditions_flow_through() {
        let store = Arc::new(InMemoryStore::new());
        let id = seeded_review(&store, ReviewStatus::Planning).await;

        let decision = engine(store)
            .can_transition(&id, ReviewStatus::Scheduled, CallerRole::Coordinator)
            .await
            .unwrap();

        assert!(!decision.allowed);
        assert!(decision
            .errors
            .contains(&TransitionError::Guard(GuardError::LeadReviewerNotAssigned)));
        // Empty team, no dates: every declared condition is unmet.
        assert_eq!(decision.conditions.len(), 3);
        assert!(decision.conditions.iter().all(|c| !c.met));
    }

    #[tokio::test]
    async fn test_available_transitions_respect_the_caller_role() {
        let store = Arc::new(InMemoryStore::new());
        let id = seeded_review(&store, ReviewStatus::Requested).await;
        let engine = engine(store);

        let for_coordinator = engine
            .available_transitions(&id, CallerRole::Coordinator)
            .await
            .unwrap();
        let targets: Vec<_> = for_coordinator.iter().map(|t| t.to).collect();
        assert_eq!(targets, vec![ReviewStatus::Approved, ReviewStatus::Cancelled]);
        assert!(for_coordinator.iter().all(|t| t.allowed));
        assert!(for_coordinator[1].requires_reason);

        let for_reviewer = engine
            .available_transitions(&id, CallerRole::Reviewer)
            .await
            .unwrap();
        assert!(for_reviewer.is_empty());
    }

    #[tokio::test]
    async fn test_execute_applies_and_reports_the_previous_status() {
        let store = Arc::new(InMemoryStore::new());
        let id = seeded_review(&store, ReviewStatus::Requested).await;

        let result = engine(Arc::clone(&store))
            .execute_transition(
                &id,
                ReviewStatus::Approved,
                &caller(CallerRole::Coordinator),
                TransitionMetadata::default(),
            )
            .await
            .unwrap();

        match result {
            ExecutionResult::Applied { review, previous, .. } => {
                assert_eq!(review.status, ReviewStatus::Approved);
                assert_eq!(previous, ReviewStatus::Requested);
            }
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancellation_reason_lands_in_the_notes() {
        let store = Arc::new(InMemoryStore::new());
        let id = seeded_review(&store, ReviewStatus::Approved).await;

        engine(Arc::clone(&store))
            .execute_transition(
                &id,
                ReviewStatus::Cancelled,
                &caller(CallerRole::Coordinator),
                TransitionMetadata {
                    reason: Some("host merger in progress".to_string()),
                },
            )
            .await
            .unwrap();

        let snapshot = store.snapshot(&id).await.unwrap().unwrap();
        assert_eq!(snapshot.review.notes, "Cancelled: host merger in progress");
        assert_eq!(snapshot.review.status, ReviewStatus::Cancelled);
    }

    /// A repository whose snapshot says REQUESTED but whose commit reports a
    /// concurrent change, simulating a racing caller landing first.
    struct RacingStore;

    #[async_trait]
    impl ReviewRepository for RacingStore {
        async fn snapshot(
            &self,
            _id: &ReviewId,
        ) -> Result<Option<ReviewSnapshot>, RepositoryError> {
            Ok(Some(ReviewSnapshot::new(Review::new(
                OrganizationId::new(),
                None,
            ))))
        }

        async fn update_status(
            &self,
            _id: &ReviewId,
            _expected: ReviewStatus,
            _update: StatusUpdate,
        ) -> Result<StatusUpdateResult, RepositoryError> {
            Ok(StatusUpdateResult::Conflict {
                actual: ReviewStatus::Cancelled,
            })
        }

        async fn insert_member(
            &self,
            _member: ReviewTeamMember,
        ) -> Result<MemberInsert, RepositoryError> {
            Ok(MemberInsert::ReviewNotFound)
        }

        async fn insert_lead_member(
            &self,
            _member: ReviewTeamMember,
            _replacing: Option<TeamMemberId>,
        ) -> Result<MemberInsert, RepositoryError> {
            Ok(MemberInsert::ReviewNotFound)
        }
    }

    /// Execution authorizes against the caller's role, so an identity
    /// carrying an unpermitted role is rejected before any write.
    #[tokio::test]
    async fn test_execute_rejects_an_unpermitted_caller() {
        let store = Arc::new(InMemoryStore::new());
        let id = seeded_review(&store, ReviewStatus::Requested).await;

        let result = engine(Arc::clone(&store))
            .execute_transition(
                &id,
                ReviewStatus::Approved,
                &caller(CallerRole::Reviewer),
                TransitionMetadata::default(),
            )
            .await
            .unwrap();

        match result {
            ExecutionResult::Rejected(decision) => {
                assert!(matches!(
                    decision.errors[..],
                    [TransitionError::RoleNotPermitted { .. }]
                ));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        let snapshot = store.snapshot(&id).await.unwrap().unwrap();
        assert_eq!(snapshot.review.status, ReviewStatus::Requested);
    }

    #[test]
    fn test_update_stamps_missing_dates_and_preserves_set_ones() {
        let mut review = Review::new(OrganizationId::new(), None);
        let metadata = TransitionMetadata::default();

        let update = build_update(&review, ReviewStatus::InProgress, &metadata);
        assert!(update.actual_start_date.is_some());
        assert!(update.actual_end_date.is_none());

        let started = Utc::now();
        review.actual_start_date = Some(started);
        let update = build_update(&review, ReviewStatus::InProgress, &metadata);
        assert!(update.actual_start_date.is_none());

        let update = build_update(&review, ReviewStatus::ReportDrafting, &metadata);
        assert!(update.actual_end_date.is_some());
        assert!(update.actual_start_date.is_none());
    }

    #[test]
    fn test_update_carries_a_note_only_when_cancelling_with_a_reason() {
        let review = Review::new(OrganizationId::new(), None);

        let silent = build_update(&review, ReviewStatus::Cancelled, &TransitionMetadata::default());
        assert_eq!(silent.append_note, None);

        let with_reason = build_update(
            &review,
            ReviewStatus::Cancelled,
            &TransitionMetadata {
                reason: Some("scope withdrawn".to_string()),
            },
        );
        assert_eq!(with_reason.append_note.as_deref(), Some("Cancelled: scope withdrawn"));

        // A reason on a non-cancellation target is ignored.
        let approved = build_update(
            &review,
            ReviewStatus::Approved,
            &TransitionMetadata {
                reason: Some("irrelevant".to_string()),
            },
        );
        assert_eq!(approved.append_note, None);
    }

    /// Losing the commit race is an ordinary rejection carrying both the
    /// validated and the actual status, never a lost update.
    #[tokio::test]
    async fn test_commit_race_surfaces_as_concurrent_modification() {
        let engine = WorkflowEngine::new(Arc::new(RacingStore), WorkflowPolicy::default());

        let result = engine
            .execute_transition(
                &ReviewId::new(),
                ReviewStatus::Approved,
                &caller(CallerRole::Coordinator),
                TransitionMetadata::default(),
            )
            .await
            .unwrap();

        match result {
            ExecutionResult::Rejected(decision) => {
                assert_eq!(
                    decision.errors,
                    vec![TransitionError::ConcurrentModification {
                        expected: ReviewStatus::Requested,
                        actual: ReviewStatus::Cancelled,
                    }]
                );
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }
}
