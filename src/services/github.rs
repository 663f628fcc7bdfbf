use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use log::{debug, error};

use crate::error::{Result, RoastError};
use crate::models::github::{
    LanguageStats, Profile, RawEvent, Repository, StarredRepo, StarredSummary, StatsRepo,
};
use crate::services::normalize;

const GITHUB_API_URL: &str = "https://api.github.com";

/// Thin fetch+validate wrapper around the GitHub REST endpoints the
/// roast feeds on. One instance per process, shared immutably; every
/// call makes its own request and is safe to run concurrently.
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    /// A missing token is fine; GitHub just applies the lower
    /// unauthenticated rate limit.
    pub fn new(token: Option<String>) -> anyhow::Result<Self> {
        Self::with_base_url(token, GITHUB_API_URL.to_string())
    }

    fn with_base_url(token: Option<String>, base_url: String) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("github-griller"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));

        if let Some(t) = token {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", t))?);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// One GET, one typed decode. Non-2xx becomes `UpstreamFetch`; a body
    /// that doesn't match `T` becomes `SchemaValidation`. No retries and
    /// no rate-limit backoff, so a 403/429 surfaces like any other error.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, context: &'static str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("GitHub API error {} for {}: {}", status, url, body);
            return Err(RoastError::UpstreamFetch {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to decode {} payload: {}", context, e);
            RoastError::SchemaValidation { context, source: e }
        })
    }

    /// Last 15 repos sorted by push date, reduced to the roast shape.
    pub async fn fetch_repositories(&self, username: &str) -> Result<Vec<Repository>> {
        self.get_json(
            &format!("/users/{}/repos?sort=pushed&per_page=15", username),
            "repository list",
        )
        .await
    }

    /// Language histogram over up to 100 repos of every type.
    pub async fn fetch_language_stats(&self, username: &str) -> Result<LanguageStats> {
        let repos: Vec<StatsRepo> = self
            .get_json(
                &format!("/users/{}/repos?per_page=100&type=all", username),
                "repository stats list",
            )
            .await?;
        Ok(normalize::tally_languages(&repos))
    }

    /// Summary of the newest page of starred repos.
    pub async fn fetch_starred(&self, username: &str) -> Result<StarredSummary> {
        let starred: Vec<StarredRepo> = self
            .get_json(
                &format!("/users/{}/starred?per_page=20&sort=created", username),
                "starred list",
            )
            .await?;
        Ok(normalize::summarize_starred(starred))
    }

    /// Commit messages flattened out of the user's last 100 events.
    pub async fn fetch_commit_messages(&self, username: &str) -> Result<Vec<String>> {
        let events: Vec<RawEvent> = self
            .get_json(&format!("/users/{}/events?per_page=100", username), "event list")
            .await?;
        Ok(normalize::flatten_push_events(events))
    }

    pub async fn fetch_profile(&self, username: &str) -> Result<Profile> {
        self.get_json(&format!("/users/{}", username), "user profile").await
    }

    /// Cheap existence probe used before the expensive tool flow.
    ///
    /// Only a 404 means "not found"; any other non-2xx is a real failure
    /// and must not be mistaken for a missing user.
    pub async fn check_user_exists(&self, username: &str) -> Result<bool> {
        let url = format!("{}/users/{}", self.base_url, username);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            error!("GitHub API error {} probing {}", status, url);
            return Err(RoastError::UpstreamFetch {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            });
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(server: &mockito::ServerGuard) -> GitHubClient {
        GitHubClient::with_base_url(None, server.url()).expect("client should build")
    }

    const REPOS_BODY: &str = r#"[
        {"name": "hello-world", "language": "Rust", "pushed_at": "2026-01-10T12:00:00Z",
         "stargazers_count": 3, "forks": 1, "full_name": "octocat/hello-world", "private": false},
        {"name": "dotfiles", "language": null, "pushed_at": "2024-06-01T00:00:00Z",
         "stargazers_count": 0, "forks": 0}
    ]"#;

    #[tokio::test]
    async fn fetch_repositories_projects_the_minimal_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users/octocat/repos?sort=pushed&per_page=15")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(REPOS_BODY)
            .create_async()
            .await;

        let repos = test_client(&server)
            .fetch_repositories("octocat")
            .await
            .expect("fetch should succeed");

        mock.assert_async().await;
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].name, "hello-world");
        assert_eq!(repos[0].language.as_deref(), Some("Rust"));
        assert_eq!(repos[0].stargazers_count, 3);
        assert!(repos[1].language.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_an_upstream_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/octocat/repos?sort=pushed&per_page=15")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = test_client(&server)
            .fetch_repositories("octocat")
            .await
            .expect_err("500 should fail");

        match err {
            RoastError::UpstreamFetch { status, .. } => assert_eq!(status, 500),
            other => panic!("expected UpstreamFetch, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_schema_validation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/octocat/repos?sort=pushed&per_page=15")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "not an array"}"#)
            .create_async()
            .await;

        let err = test_client(&server)
            .fetch_repositories("octocat")
            .await
            .expect_err("wrong shape should fail");

        match err {
            RoastError::SchemaValidation { context, .. } => {
                assert_eq!(context, "repository list")
            }
            other => panic!("expected SchemaValidation, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn language_stats_come_back_tallied() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/octocat/repos?per_page=100&type=all")
            .with_status(200)
            .with_body(
                r#"[{"name": "a", "language": "Rust"},
                    {"name": "b", "language": "Rust"},
                    {"name": "c", "language": null}]"#,
            )
            .create_async()
            .await;

        let stats = test_client(&server)
            .fetch_language_stats("octocat")
            .await
            .expect("fetch should succeed");

        assert_eq!(stats.total_repos, 2);
        assert_eq!(stats.top_languages[0].language, "Rust");
        assert_eq!(stats.top_languages[0].percentage, 100);
    }

    #[tokio::test]
    async fn commit_messages_are_filtered_and_flattened() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"[
            {"id": "1", "type": "PushEvent",
             "repo": {"id": 1, "name": "octocat/hello", "url": "https://api.github.com/repos/octocat/hello"},
             "payload": {"commits": [
                 {"sha": "a1", "author": {"email": "o@c.dev", "name": "octocat"},
                  "message": "fix things", "distinct": true, "url": "https://example.invalid"}
             ]}},
            {"id": "2", "type": "WatchEvent",
             "repo": {"id": 1, "name": "octocat/hello", "url": "https://api.github.com/repos/octocat/hello"},
             "payload": {}}
        ]"#;
        server
            .mock("GET", "/users/octocat/events?per_page=100")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let messages = test_client(&server)
            .fetch_commit_messages("octocat")
            .await
            .expect("fetch should succeed");

        assert_eq!(messages, ["fix things"]);
    }

    #[tokio::test]
    async fn existence_probe_distinguishes_404_success_and_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/ghost")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/users/octocat")
            .with_status(200)
            .with_body(r#"{"login": "octocat"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/users/flaky")
            .with_status(503)
            .create_async()
            .await;

        let client = test_client(&server);
        assert!(!client.check_user_exists("ghost").await.unwrap());
        assert!(client.check_user_exists("octocat").await.unwrap());

        let err = client.check_user_exists("flaky").await.expect_err("503 is fatal");
        match err {
            RoastError::UpstreamFetch { status, .. } => assert_eq!(status, 503),
            other => panic!("expected UpstreamFetch, got: {:?}", other),
        }
    }
}
