use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Result, RoastError};
use crate::services::gemini::{FunctionDeclaration, Tool};
use crate::services::github::GitHubClient;

/// The data-fetching operations exposed to the model. The existence
/// probe is deliberately not in this list; it runs before generation
/// starts and is not the model's to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GithubOp {
    Repositories,
    LanguageStats,
    Starred,
    CommitMessages,
    Profile,
}

impl GithubOp {
    pub const ALL: [GithubOp; 5] = [
        GithubOp::Repositories,
        GithubOp::LanguageStats,
        GithubOp::Starred,
        GithubOp::CommitMessages,
        GithubOp::Profile,
    ];

    fn name(self) -> &'static str {
        match self {
            GithubOp::Repositories => "fetch_github_repos",
            GithubOp::LanguageStats => "fetch_language_stats",
            GithubOp::Starred => "fetch_starred_repos",
            GithubOp::CommitMessages => "fetch_commit_messages",
            GithubOp::Profile => "fetch_github_profile",
        }
    }

    fn description(self) -> &'static str {
        match self {
            GithubOp::Repositories => {
                "Fetches a user's public repositories sorted by most recently pushed, \
                 with name, language, push date, stars and forks."
            }
            GithubOp::LanguageStats => {
                "Fetches a breakdown of which programming languages a user's repositories \
                 are written in, with counts and percentages."
            }
            GithubOp::Starred => {
                "Fetches a summary of the repositories a user has starred recently, \
                 including the languages they admire from afar."
            }
            GithubOp::CommitMessages => {
                "Fetches the user's recent commit messages from their public push events."
            }
            GithubOp::Profile => {
                "Fetches a user's GitHub profile: bio, follower counts, account age and such."
            }
        }
    }
}

/// One bound tool: a GitHub fetch operation tied to the request's
/// username. Each call makes its own HTTP request, so concurrent
/// invocations within a turn don't share anything mutable.
pub struct GithubTool {
    op: GithubOp,
    github: Arc<GitHubClient>,
    username: String,
}

impl GithubTool {
    pub fn new(op: GithubOp, github: Arc<GitHubClient>, username: impl Into<String>) -> Self {
        Self {
            op,
            github,
            username: username.into(),
        }
    }
}

#[async_trait]
impl Tool for GithubTool {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: self.op.name().to_string(),
            description: self.op.description().to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "username": {
                        "type": "string",
                        "description": "The GitHub username to look up."
                    }
                },
                "required": ["username"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        // Fall back to the bound username when the model leaves it out.
        let username = args
            .get("username")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.username)
            .to_string();

        let value = match self.op {
            GithubOp::Repositories => to_value(self.github.fetch_repositories(&username).await?)?,
            GithubOp::LanguageStats => to_value(self.github.fetch_language_stats(&username).await?)?,
            GithubOp::Starred => to_value(self.github.fetch_starred(&username).await?)?,
            GithubOp::CommitMessages => {
                to_value(self.github.fetch_commit_messages(&username).await?)?
            }
            GithubOp::Profile => to_value(self.github.fetch_profile(&username).await?)?,
        };
        Ok(value)
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| RoastError::Generation(format!("failed to encode tool result: {}", e)))
}
