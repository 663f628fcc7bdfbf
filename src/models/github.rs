use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Minimal repository projection handed to the model.
///
/// Decoding from the API response already drops every field not listed
/// here, so the same struct serves as both the decode target and the
/// tool output. A null `pushed_at` fails decoding: the roast angles lean
/// on push recency, and a repo without it is out of shape.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Repository {
    pub name: String,
    pub language: Option<String>,
    pub pushed_at: DateTime<Utc>,
    pub stargazers_count: u32,
    pub forks: u32,
}

/// Repo slice used only to derive language statistics.
#[derive(Debug, Deserialize)]
pub struct StatsRepo {
    pub name: String,
    pub language: Option<String>,
}

/// Starred repo reduced to what the roast needs.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StarredRepo {
    pub name: String,
    pub language: Option<String>,
    pub description: Option<String>,
    pub stargazers_count: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Profile {
    pub login: String,
    pub id: u64,
    pub avatar_url: String,
    pub html_url: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub public_repos: u32,
    pub followers: u32,
    pub following: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Envelope of a user event from `/users/{username}/events`.
///
/// Only `PushEvent` entries with a non-empty commit list are relevant;
/// everything else is filtered out before flattening.
#[derive(Debug, Deserialize)]
pub struct RawEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub repo: EventRepo,
    pub payload: EventPayload,
}

#[derive(Debug, Deserialize)]
pub struct EventRepo {
    pub id: u64,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub commits: Option<Vec<EventCommit>>,
}

#[derive(Debug, Deserialize)]
pub struct EventCommit {
    pub sha: String,
    pub author: EventCommitAuthor,
    pub message: String,
    pub distinct: bool,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct EventCommitAuthor {
    pub email: String,
    pub name: String,
}

/// One language with the number of repos written in it.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct LanguageCount {
    pub language: String,
    pub count: u32,
}

#[derive(Debug, Serialize, Clone)]
pub struct TopLanguage {
    pub language: String,
    pub count: u32,
    pub percentage: u32,
}

/// Language histogram over a user's repos.
///
/// `total_repos` counts only repos with a known language, so the counts
/// in `languages` always sum to it. `languages` keeps first-seen order,
/// which also breaks ties in `top_languages`.
#[derive(Debug, Serialize, Clone)]
pub struct LanguageStats {
    pub total_repos: u32,
    pub languages: Vec<LanguageCount>,
    pub top_languages: Vec<TopLanguage>,
}

/// Summary of a user's starred repos.
///
/// `total_starred` counts the whole fetched page (up to 20), while the
/// language tally and `recent_stars` only sample the first 10 of it.
#[derive(Debug, Serialize, Clone)]
pub struct StarredSummary {
    pub total_starred: usize,
    pub top_starred_languages: Vec<LanguageCount>,
    pub recent_stars: Vec<StarredRepo>,
}

/// Repo shape used by the insights endpoint, which fetches on its own
/// and reads `forks_count` where the roast tools read `forks`.
#[derive(Debug, Deserialize)]
pub struct InsightRepo {
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    pub language: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RepoStatsSummary {
    pub total_stars: u64,
    pub total_forks: u64,
    pub top_languages: Vec<String>,
    pub recent_count: usize,
}
