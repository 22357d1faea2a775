//! Workflow policy: tunable thresholds and the role-permission table.
//!
//! Role permissions are defined once here as shared groups and referenced by
//! every registry entry, so transitions that share a permission policy cannot
//! drift apart.

use anyhow::{Context, Result};
use std::env;

use crate::status::CallerRole;

/// Roles that own the review programme: approve, plan, schedule, complete,
/// cancel.
pub const COORDINATION_ROLES: &[CallerRole] = &[CallerRole::Admin, CallerRole::Coordinator];

/// Coordination roles plus the lead reviewer, for transitions driven by the
/// visiting team itself: starting the visit and moving the report forward.
pub const EXECUTION_ROLES: &[CallerRole] = &[
    CallerRole::Admin,
    CallerRole::Coordinator,
    CallerRole::LeadReviewer,
];

/// Tunable thresholds for guard and assignment rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPolicy {
    /// Hard minimum team size for PLANNING → SCHEDULED.
    pub min_team_members: usize,
    /// Team size below which scheduling produces a warning.
    pub recommended_team_members: usize,
    /// Minimum confirmed members for SCHEDULED → IN_PROGRESS.
    pub min_confirmed_members: usize,
    /// Completed reviews required before a reviewer may lead.
    pub min_reviews_for_lead: u32,
    /// Minimum trimmed length of a cross-team assignment justification.
    pub min_cross_team_justification: usize,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            min_team_members: 2,
            recommended_team_members: 3,
            min_confirmed_members: 2,
            min_reviews_for_lead: 3,
            min_cross_team_justification: 10,
        }
    }
}

impl WorkflowPolicy {
    /// Build a policy from the environment, falling back to defaults for
    /// unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a policy from an arbitrary variable source. `from_env` is this
    /// with `std::env::var`; tests pass a closure and never touch process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            min_team_members: parse_or(
                &lookup,
                "PEERVIEW_MIN_TEAM_MEMBERS",
                defaults.min_team_members,
            )?,
            recommended_team_members: parse_or(
                &lookup,
                "PEERVIEW_RECOMMENDED_TEAM_MEMBERS",
                defaults.recommended_team_members,
            )?,
            min_confirmed_members: parse_or(
                &lookup,
                "PEERVIEW_MIN_CONFIRMED_MEMBERS",
                defaults.min_confirmed_members,
            )?,
            min_reviews_for_lead: parse_or(
                &lookup,
                "PEERVIEW_MIN_REVIEWS_FOR_LEAD",
                defaults.min_reviews_for_lead,
            )?,
            min_cross_team_justification: parse_or(
                &lookup,
                "PEERVIEW_MIN_CROSS_TEAM_JUSTIFICATION",
                defaults.min_cross_team_justification,
            )?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("{name} must be a valid number")),
        None => Ok(default),
    }
}
