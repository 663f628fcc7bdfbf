use std::sync::Arc;

use log::{debug, info};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::roast::{RoastRequest, StreamEvent};
use crate::services::gemini::{GeminiClient, Tool};
use crate::services::github::GitHubClient;
use crate::services::tools::{GithubOp, GithubTool};
use crate::utils::personality::{
    intensity_for, voice_for, IntensityLevel, DEFAULT_INTENSITY, DEFAULT_PERSONALITY,
};

/// Drives one roast from request to final text:
/// existence check, prompt assembly, tool binding, streamed generation.
///
/// Everything is request-scoped; the orchestrator itself only holds the
/// two shared clients.
pub struct RoastOrchestrator {
    github: Arc<GitHubClient>,
    gemini: Arc<GeminiClient>,
}

impl RoastOrchestrator {
    pub fn new(github: Arc<GitHubClient>, gemini: Arc<GeminiClient>) -> Self {
        Self { github, gemini }
    }

    /// Generate a roast, forwarding chunks to `events` as they arrive,
    /// and return the aggregated text.
    ///
    /// A nonexistent username is not an error: it flips to a themed
    /// "roast the ghost" generation with no tools attached. Everything
    /// else non-2xx at the probe is fatal.
    pub async fn roast(
        &self,
        request: &RoastRequest,
        events: &mpsc::Sender<StreamEvent>,
    ) -> Result<String> {
        let voice = voice_for(
            request
                .personality
                .as_deref()
                .unwrap_or(DEFAULT_PERSONALITY),
        );
        let level = intensity_for(request.intensity.unwrap_or(DEFAULT_INTENSITY));
        let username = request.username.as_str();

        let exists = self.github.check_user_exists(username).await?;

        let final_text = if exists {
            info!("roasting {} (intensity {})", username, level.level);
            let prompt = roast_prompt(username, voice, level);
            let tools = bind_tools(self.github.clone(), username);
            self.gemini
                .generate_stream(&prompt, &tools, level.temperature, events)
                .await?
        } else {
            info!("user {} does not exist, roasting the ghost", username);
            let prompt = ghost_prompt(username, voice, level);
            self.gemini
                .generate_stream(&prompt, &[], level.temperature, events)
                .await?
        };

        if events
            .send(StreamEvent::done(final_text.clone()))
            .await
            .is_err()
        {
            debug!("caller went away before the final frame");
        }
        Ok(final_text)
    }
}

/// The five data fetchers, bound to the request's username. The
/// existence probe stays off this table.
fn bind_tools(github: Arc<GitHubClient>, username: &str) -> Vec<Box<dyn Tool>> {
    GithubOp::ALL
        .into_iter()
        .map(|op| Box::new(GithubTool::new(op, github.clone(), username)) as Box<dyn Tool>)
        .collect()
}

fn roast_prompt(username: &str, voice: &str, level: &IntensityLevel) -> String {
    format!(
        r#"You are {voice}.

Your task is to write a short, funny roast of the developer "{username}" based on their public GitHub presence.

{guideline}

Using the provided tools, fetch their profile, repositories, language breakdown, starred repositories, and recent commit messages, then roast them based on what you find.

Roast them! Consider these angles:
- Their profile: the bio, the follower-to-following ratio, the account age versus what they have to show for it.
- Their repositories: too many unfinished projects (look at the pushed dates), weird or unoriginal repository names, a graveyard of forks with no original work.
- Their languages: sticking to only one language, or collecting half-learned ones like merit badges.
- Their stars: a complete lack of stars on their own work, or what they star versus what they actually build.
- Their commit messages: "fix", "fix again", "final fix v2" and other confessions.

If a tool call fails, work with whatever data you successfully retrieved. Even if all tools fail, roast them based on the username alone. Never mention missing data, failed lookups, or the tools themselves.

You only have one task: roast the developer based on their GitHub activity and nothing else.

Return the roast as a single piece of text, no other commentary or explanation needed."#,
        voice = voice,
        username = username,
        guideline = level.guideline,
    )
}

/// Short no-tools prompt for usernames that don't exist.
fn ghost_prompt(username: &str, voice: &str, level: &IntensityLevel) -> String {
    format!(
        r#"You are {voice}.

{guideline}

Someone asked you to roast the GitHub user "{username}" — but that username does not exist. Write a short, funny roast of a developer so forgettable that even GitHub has no record of them. Feel free to mock the username itself and the kind of person who would be asked about it.

Return the roast as a single piece of text, no other commentary or explanation needed."#,
        voice = voice,
        username = username,
        guideline = level.guideline,
    )
}
