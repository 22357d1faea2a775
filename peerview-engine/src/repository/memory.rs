//! In-memory implementation of the repository traits.
//!
//! Backs the test suite and embedders that keep workflow state in process.
//! Each conditional write takes one write lock for the whole
//! check-then-write sequence, which is what makes the compare-and-swap and
//! the exclusive lead insert atomic here.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use peerview_core::model::{
    CoiOverride, Finding, OrganizationId, Report, Review, ReviewId, ReviewSnapshot,
    ReviewTeamMember, ReviewerCoi, ReviewerProfile, ReviewerProfileId, TeamId, TeamMemberId,
    TeamRole,
};
use peerview_core::status::ReviewStatus;

use super::{
    CoiRepository, MemberInsert, RepositoryError, ReviewRepository, ReviewerRepository,
    StatusUpdate, StatusUpdateResult,
};

#[derive(Debug, Clone)]
struct StoredReview {
    review: Review,
    members: Vec<ReviewTeamMember>,
    findings: Vec<Finding>,
    report: Option<Report>,
}

/// In-memory store implementing all three repository traits.
#[derive(Default)]
pub struct InMemoryStore {
    reviews: RwLock<HashMap<ReviewId, StoredReview>>,
    profiles: RwLock<HashMap<ReviewerProfileId, ReviewerProfile>>,
    regional_teams: RwLock<HashMap<OrganizationId, TeamId>>,
    conflicts: RwLock<Vec<ReviewerCoi>>,
    overrides: RwLock<Vec<CoiOverride>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding helpers. These model the writes the surrounding system
    // performs outside this engine.

    pub async fn insert_review(&self, review: Review) {
        let mut reviews = self.reviews.write().await;
        reviews.insert(
            review.id,
            StoredReview {
                review,
                members: Vec::new(),
                findings: Vec::new(),
                report: None,
            },
        );
    }

    pub async fn add_member(&self, member: ReviewTeamMember) {
        let mut reviews = self.reviews.write().await;
        if let Some(stored) = reviews.get_mut(&member.review_id) {
            stored.members.push(member);
        }
    }

    pub async fn update_member<F>(&self, review: &ReviewId, member: &TeamMemberId, apply: F)
    where
        F: FnOnce(&mut ReviewTeamMember),
    {
        let mut reviews = self.reviews.write().await;
        if let Some(stored) = reviews.get_mut(review) {
            if let Some(m) = stored.members.iter_mut().find(|m| &m.id == member) {
                apply(m);
            }
        }
    }

    pub async fn add_finding(&self, review: &ReviewId, finding: Finding) {
        let mut reviews = self.reviews.write().await;
        if let Some(stored) = reviews.get_mut(review) {
            stored.findings.push(finding);
        }
    }

    pub async fn set_report(&self, review: &ReviewId, report: Report) {
        let mut reviews = self.reviews.write().await;
        if let Some(stored) = reviews.get_mut(review) {
            stored.report = Some(report);
        }
    }

    /// Test/embedder helper for setting arbitrary review fields.
    pub async fn update_review<F>(&self, review: &ReviewId, apply: F)
    where
        F: FnOnce(&mut Review),
    {
        let mut reviews = self.reviews.write().await;
        if let Some(stored) = reviews.get_mut(review) {
            apply(&mut stored.review);
        }
    }

    pub async fn insert_profile(&self, profile: ReviewerProfile) {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.id, profile);
    }

    pub async fn set_regional_team(&self, organization: OrganizationId, team: TeamId) {
        let mut teams = self.regional_teams.write().await;
        teams.insert(organization, team);
    }

    pub async fn add_conflict(&self, conflict: ReviewerCoi) {
        let mut conflicts = self.conflicts.write().await;
        conflicts.push(conflict);
    }

    pub async fn add_override(&self, coi_override: CoiOverride) {
        let mut overrides = self.overrides.write().await;
        overrides.push(coi_override);
    }
}

#[async_trait]
impl ReviewRepository for InMemoryStore {
    async fn snapshot(&self, id: &ReviewId) -> Result<Option<ReviewSnapshot>, RepositoryError> {
        let reviews = self.reviews.read().await;
        Ok(reviews.get(id).map(|stored| ReviewSnapshot {
            review: stored.review.clone(),
            members: stored.members.clone(),
            findings: stored.findings.clone(),
            report: stored.report.clone(),
        }))
    }

    async fn update_status(
        &self,
        id: &ReviewId,
        expected: ReviewStatus,
        update: StatusUpdate,
    ) -> Result<StatusUpdateResult, RepositoryError> {
        let mut reviews = self.reviews.write().await;
        let Some(stored) = reviews.get_mut(id) else {
            return Ok(StatusUpdateResult::NotFound);
        };
        if stored.review.status != expected {
            return Ok(StatusUpdateResult::Conflict {
                actual: stored.review.status,
            });
        }

        stored.review.status = update.status;
        if let Some(start) = update.actual_start_date {
            stored.review.actual_start_date = Some(start);
        }
        if let Some(end) = update.actual_end_date {
            stored.review.actual_end_date = Some(end);
        }
        if let Some(note) = update.append_note {
            if !stored.review.notes.is_empty() {
                stored.review.notes.push('\n');
            }
            stored.review.notes.push_str(&note);
        }

        Ok(StatusUpdateResult::Updated(stored.review.clone()))
    }

    async fn insert_member(
        &self,
        member: ReviewTeamMember,
    ) -> Result<MemberInsert, RepositoryError> {
        let mut reviews = self.reviews.write().await;
        let Some(stored) = reviews.get_mut(&member.review_id) else {
            return Ok(MemberInsert::ReviewNotFound);
        };
        stored.members.push(member.clone());
        Ok(MemberInsert::Inserted(member))
    }

    async fn insert_lead_member(
        &self,
        member: ReviewTeamMember,
        replacing: Option<TeamMemberId>,
    ) -> Result<MemberInsert, RepositoryError> {
        let mut reviews = self.reviews.write().await;
        let Some(stored) = reviews.get_mut(&member.review_id) else {
            return Ok(MemberInsert::ReviewNotFound);
        };

        let seat_taken = stored.members.iter().any(|m| {
            m.role == TeamRole::LeadReviewer
                && m.is_active()
                && Some(m.id) != replacing
                && m.reviewer_profile_id != member.reviewer_profile_id
        });
        if seat_taken {
            return Ok(MemberInsert::LeadSeatTaken);
        }

        stored.members.push(member.clone());
        Ok(MemberInsert::Inserted(member))
    }
}

#[async_trait]
impl ReviewerRepository for InMemoryStore {
    async fn profile(
        &self,
        id: &ReviewerProfileId,
    ) -> Result<Option<ReviewerProfile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(id).cloned())
    }

    async fn assignable_profiles(
        &self,
        on: chrono::NaiveDate,
    ) -> Result<Vec<ReviewerProfile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles
            .values()
            .filter(|p| p.is_assignable_status() && p.is_available_on(on))
            .cloned()
            .collect())
    }

    async fn regional_team_of(
        &self,
        organization: &OrganizationId,
    ) -> Result<Option<TeamId>, RepositoryError> {
        let teams = self.regional_teams.read().await;
        Ok(teams.get(organization).copied())
    }
}

#[async_trait]
impl CoiRepository for InMemoryStore {
    async fn active_conflicts(
        &self,
        reviewer: &ReviewerProfileId,
        organization: &OrganizationId,
    ) -> Result<Vec<ReviewerCoi>, RepositoryError> {
        let conflicts = self.conflicts.read().await;
        Ok(conflicts
            .iter()
            .filter(|c| {
                c.is_active
                    && &c.reviewer_profile_id == reviewer
                    && &c.organization_id == organization
            })
            .cloned()
            .collect())
    }

    async fn approved_override(
        &self,
        reviewer: &ReviewerProfileId,
        organization: &OrganizationId,
        review: &ReviewId,
    ) -> Result<Option<CoiOverride>, RepositoryError> {
        let overrides = self.overrides.read().await;
        Ok(overrides
            .iter()
            .find(|o| {
                !o.revoked
                    && &o.reviewer_profile_id == reviewer
                    && &o.organization_id == organization
                    && &o.review_id == review
            })
            .cloned())
    }
}
