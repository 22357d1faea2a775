//! Reviewer eligibility and assignment validation.
//!
//! The eligibility rules in one place: a reviewer from the host organization
//! can never review it (no-self-review, no override path exists), a reviewer
//! from the host's regional team is eligible by default, and a reviewer from
//! a different team may only be assigned cross-team, which requires a
//! written justification and an approver.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use peerview_core::model::{
    ReviewId, ReviewTeamMember, ReviewerProfile, ReviewerProfileId, TeamId, TeamRole, UserId,
};
use peerview_core::WorkflowPolicy;

use crate::repository::{CoiRepository, MemberInsert, ReviewRepository, ReviewerRepository};
use crate::EngineError;

/// Assignment and eligibility operations over the repository traits.
///
/// Lead-reviewer assignment, which layers stricter rules on top of these,
/// lives in [`crate::lead`] as a second impl block on this type.
pub struct AssignmentEngine {
    pub(crate) reviews: Arc<dyn ReviewRepository>,
    pub(crate) reviewers: Arc<dyn ReviewerRepository>,
    pub(crate) cois: Arc<dyn CoiRepository>,
    pub(crate) policy: WorkflowPolicy,
}

/// One candidate in an eligibility listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewerCandidate {
    pub profile: ReviewerProfile,
    pub is_cross_team: bool,
    /// False for cross-team candidates, which are surfaced but not
    /// assignable without the justification flow.
    pub eligible: bool,
    pub ineligibility_reason: Option<String>,
}

/// Result of an eligibility listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibleReviewers {
    pub reviewers: Vec<ReviewerCandidate>,
    pub host_team: Option<TeamId>,
    /// Count of fully-eligible candidates; cross-team surfacing does not
    /// contribute.
    pub total_eligible: usize,
}

/// Why an assignment was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AssignmentError {
    ReviewNotFound,
    ReviewerNotFound,
    /// The reviewer's organization is the review's host organization.
    SameOrganization,
    JustificationTooShort { length: usize, minimum: usize },
    ApproverRequired,
    /// The Lead Reviewer role goes through the lead assignment flow, which
    /// applies stricter checks.
    LeadRoleNotPermitted,
}

impl fmt::Display for AssignmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReviewNotFound => write!(f, "Review not found"),
            Self::ReviewerNotFound => write!(f, "Reviewer not found"),
            Self::SameOrganization => write!(
                f,
                "Reviewers cannot be assigned to a review of their own organization"
            ),
            Self::JustificationTooShort { length, minimum } => write!(
                f,
                "Cross-team assignment justification must be at least {minimum} characters (got {length})"
            ),
            Self::ApproverRequired => {
                write!(f, "Cross-team assignment requires an approver")
            }
            Self::LeadRoleNotPermitted => {
                write!(f, "Lead Reviewer assignments use the lead assignment flow")
            }
        }
    }
}

/// Outcome of validating one proposed assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentDecision {
    pub valid: bool,
    pub is_cross_team: bool,
    pub error: Option<AssignmentError>,
}

impl AssignmentDecision {
    pub(crate) fn rejected(is_cross_team: bool, error: AssignmentError) -> Self {
        Self {
            valid: false,
            is_cross_team,
            error: Some(error),
        }
    }
}

/// Outcome of an assignment commit.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentResult {
    Assigned(ReviewTeamMember),
    Rejected(AssignmentDecision),
}

impl AssignmentEngine {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        reviewers: Arc<dyn ReviewerRepository>,
        cois: Arc<dyn CoiRepository>,
        policy: WorkflowPolicy,
    ) -> Self {
        Self {
            reviews,
            reviewers,
            cois,
            policy,
        }
    }

    /// Candidates assignable to the review today.
    ///
    /// Same-organization reviewers are dropped from the listing entirely;
    /// there is no override that makes them visible. Cross-team reviewers
    /// appear only when `include_cross_team` is set, flagged ineligible with
    /// a reason, so a coordinator can see who the justification flow would
    /// unlock.
    pub async fn eligible_reviewers(
        &self,
        review_id: &ReviewId,
        include_cross_team: bool,
    ) -> Result<EligibleReviewers, EngineError> {
        let snapshot = self
            .reviews
            .snapshot(review_id)
            .await?
            .ok_or(EngineError::ReviewNotFound(*review_id))?;
        let host_org = snapshot.review.host_organization_id;
        let host_team = snapshot.review.host_team_id;

        let today = Utc::now().date_naive();
        let pool = self.reviewers.assignable_profiles(today).await?;

        let mut reviewers = Vec::new();
        for profile in pool {
            if profile.effective_organization() == host_org {
                continue;
            }
            let team = self
                .reviewers
                .regional_team_of(&profile.effective_organization())
                .await?;
            let same_team = host_team.is_some() && team == host_team;
            if same_team {
                reviewers.push(ReviewerCandidate {
                    profile,
                    is_cross_team: false,
                    eligible: true,
                    ineligibility_reason: None,
                });
            } else if include_cross_team {
                reviewers.push(ReviewerCandidate {
                    profile,
                    is_cross_team: true,
                    eligible: false,
                    ineligibility_reason: Some(
                        "Different regional team; requires cross-team justification and approval"
                            .to_string(),
                    ),
                });
            }
        }

        // Fully-eligible candidates first, for listing stability.
        reviewers.sort_by_key(|c| c.is_cross_team);
        let total_eligible = reviewers.iter().filter(|c| c.eligible).count();

        Ok(EligibleReviewers {
            reviewers,
            host_team,
            total_eligible,
        })
    }

    /// Validate one proposed assignment without committing it.
    pub async fn validate_reviewer_assignment(
        &self,
        review_id: &ReviewId,
        reviewer_profile_id: &ReviewerProfileId,
        justification: Option<&str>,
        approver: Option<UserId>,
    ) -> Result<AssignmentDecision, EngineError> {
        let Some(snapshot) = self.reviews.snapshot(review_id).await? else {
            return Ok(AssignmentDecision::rejected(
                false,
                AssignmentError::ReviewNotFound,
            ));
        };
        let Some(profile) = self.reviewers.profile(reviewer_profile_id).await? else {
            return Ok(AssignmentDecision::rejected(
                false,
                AssignmentError::ReviewerNotFound,
            ));
        };

        let reviewer_org = profile.effective_organization();
        if reviewer_org == snapshot.review.host_organization_id {
            // Hard block: cross-team is irrelevant for a self-review.
            return Ok(AssignmentDecision::rejected(
                false,
                AssignmentError::SameOrganization,
            ));
        }

        let reviewer_team = self.reviewers.regional_team_of(&reviewer_org).await?;
        // Same rule as the eligibility listing: same-team needs a host team
        // to be same as. A host without a regional team makes every
        // assignment cross-team.
        let host_team = snapshot.review.host_team_id;
        let is_cross_team = !(host_team.is_some() && reviewer_team == host_team);
        if is_cross_team {
            let length = justification.map_or(0, |j| j.trim().len());
            let minimum = self.policy.min_cross_team_justification;
            if length < minimum {
                return Ok(AssignmentDecision::rejected(
                    true,
                    AssignmentError::JustificationTooShort { length, minimum },
                ));
            }
            if approver.is_none() {
                return Ok(AssignmentDecision::rejected(
                    true,
                    AssignmentError::ApproverRequired,
                ));
            }
        }

        Ok(AssignmentDecision {
            valid: true,
            is_cross_team,
            error: None,
        })
    }

    /// Validate and commit a non-lead team-member assignment.
    pub async fn assign_reviewer(
        &self,
        review_id: &ReviewId,
        reviewer_profile_id: &ReviewerProfileId,
        role: TeamRole,
        justification: Option<&str>,
        approver: Option<UserId>,
    ) -> Result<AssignmentResult, EngineError> {
        if role == TeamRole::LeadReviewer {
            return Ok(AssignmentResult::Rejected(AssignmentDecision::rejected(
                false,
                AssignmentError::LeadRoleNotPermitted,
            )));
        }

        let decision = self
            .validate_reviewer_assignment(review_id, reviewer_profile_id, justification, approver)
            .await?;
        if !decision.valid {
            return Ok(AssignmentResult::Rejected(decision));
        }

        let member = ReviewTeamMember::new(*review_id, *reviewer_profile_id, role);
        match self.reviews.insert_member(member).await? {
            MemberInsert::Inserted(member) => {
                info!(
                    review_id = %review_id,
                    reviewer = %reviewer_profile_id,
                    cross_team = decision.is_cross_team,
                    "reviewer assigned"
                );
                Ok(AssignmentResult::Assigned(member))
            }
            MemberInsert::ReviewNotFound => Ok(AssignmentResult::Rejected(
                AssignmentDecision::rejected(decision.is_cross_team, AssignmentError::ReviewNotFound),
            )),
            // Only reachable against a store that enforces lead exclusivity
            // on plain inserts; the lead role was rejected above.
            MemberInsert::LeadSeatTaken => Ok(AssignmentResult::Rejected(
                AssignmentDecision::rejected(decision.is_cross_team, AssignmentError::LeadRoleNotPermitted),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use peerview_core::model::{
        CoiOverride, OrganizationId, Review, ReviewerStatus, UserId,
    };

    use super::*;
    use crate::repository::InMemoryStore;

    fn engine(store: Arc<InMemoryStore>) -> AssignmentEngine {
        AssignmentEngine::new(
            Arc::clone(&store) as Arc<dyn ReviewRepository>,
            Arc::clone(&store) as Arc<dyn ReviewerRepository>,
            store,
            WorkflowPolicy::default(),
        )
    }

    fn profile(org: OrganizationId) -> ReviewerProfile {
        ReviewerProfile {
            id: ReviewerProfileId::new(),
            user_id: UserId::new(),
            organization_id: org,
            home_organization_id: None,
            status: ReviewerStatus::Certified,
            is_lead_qualified: false,
            reviews_completed: 4,
            reviews_as_lead: 0,
            is_available: true,
            available_from: None,
            available_to: None,
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        review_id: ReviewId,
        host_org: OrganizationId,
        host_team: TeamId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let host_org = OrganizationId::new();
        let host_team = TeamId::new();
        let review = Review::new(host_org, Some(host_team));
        let review_id = review.id;
        store.insert_review(review).await;
        store.set_regional_team(host_org, host_team).await;
        Fixture {
            store,
            review_id,
            host_org,
            host_team,
        }
    }

    #[tokio::test]
    async fn test_same_team_reviewer_is_eligible() {
        let fx = fixture().await;
        let org = OrganizationId::new();
        fx.store.set_regional_team(org, fx.host_team).await;
        fx.store.insert_profile(profile(org)).await;

        let listing = engine(fx.store)
            .eligible_reviewers(&fx.review_id, false)
            .await
            .unwrap();

        assert_eq!(listing.total_eligible, 1);
        assert!(listing.reviewers[0].eligible);
        assert_eq!(listing.host_team, Some(fx.host_team));
    }

    /// No-self-review has no override: a same-organization reviewer is
    /// absent from the listing even with cross-team surfacing on and an
    /// approved COI override in place for this exact review.
    #[tokio::test]
    async fn test_same_organization_reviewer_never_appears() {
        let fx = fixture().await;
        let own = profile(fx.host_org);
        let own_id = own.id;
        fx.store.insert_profile(own).await;
        fx.store
            .add_override(CoiOverride {
                reviewer_profile_id: own_id,
                organization_id: fx.host_org,
                review_id: fx.review_id,
                approved_by: UserId::new(),
                revoked: false,
                expires_at: None,
            })
            .await;

        let listing = engine(fx.store)
            .eligible_reviewers(&fx.review_id, true)
            .await
            .unwrap();

        assert!(listing.reviewers.is_empty());
        assert_eq!(listing.total_eligible, 0);
    }

    #[tokio::test]
    async fn test_cross_team_candidates_only_surface_on_request() {
        let fx = fixture().await;
        let other_org = OrganizationId::new();
        fx.store.set_regional_team(other_org, TeamId::new()).await;
        fx.store.insert_profile(profile(other_org)).await;
        let engine = engine(fx.store);

        let default_listing = engine
            .eligible_reviewers(&fx.review_id, false)
            .await
            .unwrap();
        assert!(default_listing.reviewers.is_empty());

        let expanded = engine.eligible_reviewers(&fx.review_id, true).await.unwrap();
        assert_eq!(expanded.reviewers.len(), 1);
        let candidate = &expanded.reviewers[0];
        assert!(candidate.is_cross_team);
        assert!(!candidate.eligible);
        assert!(candidate.ineligibility_reason.is_some());
        assert_eq!(expanded.total_eligible, 0);
    }

    #[tokio::test]
    async fn test_unavailable_profiles_are_not_in_the_pool() {
        let fx = fixture().await;
        let org = OrganizationId::new();
        fx.store.set_regional_team(org, fx.host_team).await;
        let mut p = profile(org);
        p.is_available = false;
        fx.store.insert_profile(p).await;
        let mut suspended = profile(org);
        suspended.status = ReviewerStatus::Suspended;
        fx.store.insert_profile(suspended).await;

        let listing = engine(fx.store)
            .eligible_reviewers(&fx.review_id, true)
            .await
            .unwrap();
        assert!(listing.reviewers.is_empty());
    }

    #[tokio::test]
    async fn test_same_team_assignment_is_valid_without_justification() {
        let fx = fixture().await;
        let org = OrganizationId::new();
        fx.store.set_regional_team(org, fx.host_team).await;
        let p = profile(org);
        let pid = p.id;
        fx.store.insert_profile(p).await;

        let decision = engine(fx.store)
            .validate_reviewer_assignment(&fx.review_id, &pid, None, None)
            .await
            .unwrap();
        assert!(decision.valid);
        assert!(!decision.is_cross_team);
    }

    #[tokio::test]
    async fn test_same_organization_assignment_is_hard_blocked() {
        let fx = fixture().await;
        let p = profile(fx.host_org);
        let pid = p.id;
        fx.store.insert_profile(p).await;

        let decision = engine(fx.store)
            .validate_reviewer_assignment(&fx.review_id, &pid, Some("plenty of justification"), Some(UserId::new()))
            .await
            .unwrap();
        assert!(!decision.valid);
        // Cross-team is irrelevant for a self-review.
        assert!(!decision.is_cross_team);
        assert_eq!(decision.error, Some(AssignmentError::SameOrganization));
    }

    /// The boundary sits at ten characters after trimming.
    #[tokio::test]
    async fn test_cross_team_justification_length_boundary() {
        let fx = fixture().await;
        let other_org = OrganizationId::new();
        fx.store.set_regional_team(other_org, TeamId::new()).await;
        let p = profile(other_org);
        let pid = p.id;
        fx.store.insert_profile(p).await;
        let engine = engine(fx.store);
        let approver = Some(UserId::new());

        let short = engine
            .validate_reviewer_assignment(&fx.review_id, &pid, Some("123456789"), approver)
            .await
            .unwrap();
        assert_eq!(
            short.error,
            Some(AssignmentError::JustificationTooShort {
                length: 9,
                minimum: 10
            })
        );
        assert!(short.is_cross_team);

        // Padding does not help; the length is measured after trimming.
        let padded = engine
            .validate_reviewer_assignment(&fx.review_id, &pid, Some("  123456789  "), approver)
            .await
            .unwrap();
        assert!(!padded.valid);

        let ok = engine
            .validate_reviewer_assignment(&fx.review_id, &pid, Some("1234567890"), approver)
            .await
            .unwrap();
        assert!(ok.valid);
        assert!(ok.is_cross_team);
    }

    /// A host organization outside any regional team has no same-team pool,
    /// so every assignment to it runs the cross-team flow; this matches the
    /// eligibility listing, which surfaces such candidates as cross-team.
    #[tokio::test]
    async fn test_host_without_a_regional_team_makes_assignment_cross_team() {
        let store = Arc::new(InMemoryStore::new());
        let review = Review::new(OrganizationId::new(), None);
        let review_id = review.id;
        store.insert_review(review).await;
        // The reviewer's organization has no regional team either.
        let p = profile(OrganizationId::new());
        let pid = p.id;
        store.insert_profile(p).await;
        let engine = engine(store);

        let bare = engine
            .validate_reviewer_assignment(&review_id, &pid, None, None)
            .await
            .unwrap();
        assert!(!bare.valid);
        assert!(bare.is_cross_team);
        assert_eq!(
            bare.error,
            Some(AssignmentError::JustificationTooShort {
                length: 0,
                minimum: 10
            })
        );

        let justified = engine
            .validate_reviewer_assignment(
                &review_id,
                &pid,
                Some("coverage gap in region"),
                Some(UserId::new()),
            )
            .await
            .unwrap();
        assert!(justified.valid);
        assert!(justified.is_cross_team);
    }

    #[tokio::test]
    async fn test_cross_team_without_approver_is_rejected() {
        let fx = fixture().await;
        let other_org = OrganizationId::new();
        fx.store.set_regional_team(other_org, TeamId::new()).await;
        let p = profile(other_org);
        let pid = p.id;
        fx.store.insert_profile(p).await;

        let decision = engine(fx.store)
            .validate_reviewer_assignment(&fx.review_id, &pid, Some("1234567890"), None)
            .await
            .unwrap();
        assert_eq!(decision.error, Some(AssignmentError::ApproverRequired));
    }

    #[tokio::test]
    async fn test_assign_reviewer_commits_a_member_row() {
        let fx = fixture().await;
        let org = OrganizationId::new();
        fx.store.set_regional_team(org, fx.host_team).await;
        let p = profile(org);
        let pid = p.id;
        fx.store.insert_profile(p).await;

        let result = engine(Arc::clone(&fx.store))
            .assign_reviewer(&fx.review_id, &pid, TeamRole::PeerReviewer, None, None)
            .await
            .unwrap();

        match result {
            AssignmentResult::Assigned(member) => {
                assert_eq!(member.reviewer_profile_id, pid);
                assert_eq!(member.role, TeamRole::PeerReviewer);
            }
            other => panic!("expected Assigned, got {other:?}"),
        }
        let snapshot = fx.store.snapshot(&fx.review_id).await.unwrap().unwrap();
        assert_eq!(snapshot.members.len(), 1);
    }

    #[tokio::test]
    async fn test_assign_reviewer_refuses_the_lead_role() {
        let fx = fixture().await;
        let result = engine(fx.store)
            .assign_reviewer(
                &fx.review_id,
                &ReviewerProfileId::new(),
                TeamRole::LeadReviewer,
                None,
                None,
            )
            .await
            .unwrap();
        match result {
            AssignmentResult::Rejected(decision) => {
                assert_eq!(decision.error, Some(AssignmentError::LeadRoleNotPermitted));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_review_and_reviewer_report_in_the_decision() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(Arc::clone(&store));

        let no_review = engine
            .validate_reviewer_assignment(&ReviewId::new(), &ReviewerProfileId::new(), None, None)
            .await
            .unwrap();
        assert_eq!(no_review.error, Some(AssignmentError::ReviewNotFound));

        let review = Review::new(OrganizationId::new(), None);
        let review_id = review.id;
        store.insert_review(review).await;
        let no_reviewer = engine
            .validate_reviewer_assignment(&review_id, &ReviewerProfileId::new(), None, None)
            .await
            .unwrap();
        assert_eq!(no_reviewer.error, Some(AssignmentError::ReviewerNotFound));
    }
}
