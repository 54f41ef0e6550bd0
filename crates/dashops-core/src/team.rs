//! The team-directory contract used for catalog enrichment.
//!
//! A service declares only its owning team slug. Member lists and team URLs
//! are looked up lazily through this contract (GitHub in production) and are
//! never persisted as source of truth.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A team looked up from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamProfile {
    /// Team slug.
    pub slug: String,
    /// Member logins.
    pub members: Vec<String>,
    /// Link to the team page, when the directory has one.
    pub url: Option<String>,
}

/// Lazy team lookup.
///
/// Callers treat failures as non-fatal: enrichment errors are logged and the
/// unenriched entity is returned unaltered.
#[async_trait]
pub trait TeamDirectory: Send + Sync + 'static {
    /// Looks up a team by slug.
    ///
    /// Returns `Error::NotFound` for unknown slugs.
    async fn team_profile(&self, slug: &str) -> Result<TeamProfile>;
}

/// In-memory directory for tests and debug bootstrap.
#[derive(Debug, Default)]
pub struct StaticTeamDirectory {
    teams: RwLock<HashMap<String, TeamProfile>>,
}

impl StaticTeamDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a team profile, keyed case-insensitively by slug.
    pub fn add_team(&self, profile: TeamProfile) {
        if let Ok(mut teams) = self.teams.write() {
            teams.insert(profile.slug.to_ascii_lowercase(), profile);
        }
    }
}

#[async_trait]
impl TeamDirectory for StaticTeamDirectory {
    async fn team_profile(&self, slug: &str) -> Result<TeamProfile> {
        let teams = self.teams.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;
        teams
            .get(&slug.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("team {slug}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let directory = StaticTeamDirectory::new();
        directory.add_team(TeamProfile {
            slug: "Platform-Squad".to_string(),
            members: vec!["jdoe".to_string()],
            url: Some("https://github.com/orgs/dash-ops/teams/platform-squad".to_string()),
        });

        let profile = directory.team_profile("platform-squad").await.unwrap();
        assert_eq!(profile.members, vec!["jdoe"]);

        let err = directory.team_profile("ghosts").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
