//! GitHub-backed team directory.
//!
//! Looks up a team and its members from the GitHub REST API to enrich
//! catalog responses. Failures surface as core errors; the catalog swallows
//! them per the enrichment contract.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use dashops_core::{Error, Result, TeamDirectory, TeamProfile};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("dash-ops/", env!("CARGO_PKG_VERSION"));

/// HTTP client resolving teams via `GET /orgs/{org}/teams/{slug}`.
#[derive(Clone)]
pub struct GithubTeamClient {
    api_url: String,
    org: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TeamBody {
    slug: String,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberBody {
    login: String,
}

impl GithubTeamClient {
    /// Creates a client for the given API base URL and organization.
    #[must_use]
    pub fn new(api_url: impl Into<String>, org: impl Into<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_url: api_url.into(),
            org: org.into(),
            token,
            client,
        }
    }

    fn team_url(&self, slug: &str) -> String {
        format!(
            "{}/orgs/{}/teams/{slug}",
            self.api_url.trim_end_matches('/'),
            self.org
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut request = self.client.get(url).header("Accept", "application/vnd.github+json");
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::backend("github", "team_profile", e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!("github resource {url}"))),
            status if status.is_success() => {
                response.json::<T>().await.map_err(|e| Error::Serialization {
                    message: format!("invalid github response: {e}"),
                })
            }
            status => Err(Error::backend(
                "github",
                "team_profile",
                format!("unexpected status {status} from {url}"),
            )),
        }
    }
}

#[async_trait]
impl TeamDirectory for GithubTeamClient {
    async fn team_profile(&self, slug: &str) -> Result<TeamProfile> {
        let team: TeamBody = self.get_json(&self.team_url(slug)).await?;
        let members: Vec<MemberBody> = self
            .get_json(&format!("{}/members", self.team_url(slug)))
            .await?;

        Ok(TeamProfile {
            slug: team.slug,
            members: members.into_iter().map(|m| m.login).collect(),
            url: team.html_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::{Json, Router};

    async fn spawn_github_stub() -> String {
        let app = Router::new()
            .route(
                "/orgs/dash-ops/teams/platform",
                get(|| async {
                    Json(serde_json::json!({
                        "slug": "platform",
                        "html_url": "https://github.com/orgs/dash-ops/teams/platform"
                    }))
                }),
            )
            .route(
                "/orgs/dash-ops/teams/platform/members",
                get(|| async {
                    Json(serde_json::json!([
                        {"login": "jdoe"},
                        {"login": "asmith"}
                    ]))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn resolves_team_and_members() {
        let base = spawn_github_stub().await;
        let client = GithubTeamClient::new(base, "dash-ops", None);

        let profile = client.team_profile("platform").await.unwrap();
        assert_eq!(profile.slug, "platform");
        assert_eq!(profile.members, vec!["jdoe", "asmith"]);
        assert!(profile.url.as_deref().unwrap().contains("/teams/platform"));
    }

    #[tokio::test]
    async fn unknown_team_is_not_found() {
        let base = spawn_github_stub().await;
        let client = GithubTeamClient::new(base, "dash-ops", None);
        assert!(matches!(
            client.team_profile("ghosts").await,
            Err(Error::NotFound(_))
        ));
    }
}
