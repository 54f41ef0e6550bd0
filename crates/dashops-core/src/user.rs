//! The authenticated principal supplied by the transport layer.
//!
//! Identity itself is external: an upstream OAuth2 middleware authenticates
//! the request and hands the core a [`UserContext`]. The core never sees
//! tokens or sessions.

use serde::{Deserialize, Serialize};

/// Authenticated principal attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// Login / handle of the user.
    pub username: String,
    /// Display name, falls back to the username when the provider has none.
    #[serde(default)]
    pub name: String,
    /// Email address.
    pub email: String,
    /// Team slugs the user belongs to.
    #[serde(default)]
    pub teams: Vec<String>,
}

impl UserContext {
    /// Creates a user context with an empty team list.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            name: name.into(),
            email: email.into(),
            teams: Vec::new(),
        }
    }

    /// Replaces the team list.
    #[must_use]
    pub fn with_teams(mut self, teams: Vec<String>) -> Self {
        self.teams = teams;
        self
    }

    /// Returns true when the user belongs to `team`.
    ///
    /// Team matching is case-insensitive everywhere in Dash-Ops.
    #[must_use]
    pub fn is_member_of(&self, team: &str) -> bool {
        self.teams.iter().any(|t| t.eq_ignore_ascii_case(team))
    }

    /// Returns the git-style author string `"Name <email>"`.
    #[must_use]
    pub fn author(&self) -> String {
        let name = if self.name.is_empty() {
            &self.username
        } else {
            &self.name
        };
        format!("{name} <{}>", self.email)
    }
}
