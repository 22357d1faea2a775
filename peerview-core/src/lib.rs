//! Domain core of the peer-review audit workflow.
//!
//! This crate is pure: no I/O, no async, no clocks beyond what callers pass
//! in. It defines:
//! - **Status & roles**: the nine-state review lifecycle and caller roles.
//! - **Model**: the entities the workflow reads (reviews, team members,
//!   reviewer profiles, conflicts of interest, findings, reports) and the
//!   [`model::ReviewSnapshot`] read-view.
//! - **Validation**: structured guard results — errors, warnings and
//!   `(condition, met)` checklists.
//! - **Policy**: tunable thresholds and the central role-permission table.
//! - **Registry**: the legal-transition table, with one pure guard function
//!   per guarded transition.
//!
//! The effectful half — repositories, the transition executor, eligibility
//! and lead qualification — lives in `peerview-engine`.

mod guard;
pub mod model;
pub mod policy;
pub mod registry;
pub mod status;
pub mod validation;

pub use model::{
    CapStatus, CoiOverride, CorrectiveActionPlan, Finding, FindingId, FindingSeverity,
    FindingType, InvitationStatus, OrganizationId, Report, ReportStatus, Review, ReviewId,
    ReviewSnapshot, ReviewTeamMember, ReviewerCoi, ReviewerProfile, ReviewerProfileId,
    ReviewerStatus, TeamId, TeamMemberId, TeamRole, UserId,
};
pub use policy::WorkflowPolicy;
pub use registry::{registry, StatusFlowEntry, TransitionRegistry, TransitionSpec};
pub use status::{Caller, CallerRole, ReviewStatus};
pub use validation::{Condition, ConditionStatus, GuardError, GuardReport, GuardWarning};
