use actix_web::{web, HttpResponse, Result as ActixResult};
use anyhow::Context;
use chrono::Utc;
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::handlers::AppState;
use crate::models::github::InsightRepo;
use crate::models::roast::{Insights, InsightsRequest};
use crate::services::normalize;

const GITHUB_API_URL: &str = "https://api.github.com";
const INSIGHTS_TEMPERATURE: f32 = 0.7;

/// Profile fields the insight cards are built from.
#[derive(Debug, Deserialize)]
struct InsightUser {
    login: String,
    name: Option<String>,
    bio: Option<String>,
    followers: u32,
    public_repos: u32,
}

/// Turns a GitHub profile into three short insight cards
/// (strengths / trend / recommendation) aimed at managers and
/// recruiters. This path fetches GitHub on its own and keeps its own
/// looser error handling; it shares nothing with the roast flow except
/// the stats summarizer.
pub async fn handle_insights(
    body: web::Json<InsightsRequest>,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let username = body.username.trim().to_string();
    if username.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({ "error": "username required" })));
    }

    let user = match fetch_user(&data.insights_http, &username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(json!({ "error": "github user not found" })))
        }
        Err(e) => {
            error!("insight profile fetch for {} failed: {:#}", username, e);
            return Ok(HttpResponse::InternalServerError().json(json!({ "error": "server error" })));
        }
    };

    match build_insights(&data, &username, user).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => {
            error!("insights for {} failed: {:#}", username, e);
            Ok(HttpResponse::InternalServerError().json(json!({ "error": "server error" })))
        }
    }
}

async fn fetch_user(client: &reqwest::Client, username: &str) -> anyhow::Result<Option<InsightUser>> {
    let response = client
        .get(format!("{}/users/{}", GITHUB_API_URL, username))
        .send()
        .await
        .context("profile request failed")?;

    if !response.status().is_success() {
        return Ok(None);
    }
    let user = response.json().await.context("profile body unreadable")?;
    Ok(Some(user))
}

async fn build_insights(
    data: &web::Data<AppState>,
    username: &str,
    user: InsightUser,
) -> anyhow::Result<Value> {
    let repos: Vec<InsightRepo> = data
        .insights_http
        .get(format!("{}/users/{}/repos?per_page=100", GITHUB_API_URL, username))
        .send()
        .await
        .context("repo request failed")?
        .json()
        .await
        .context("repo body unreadable")?;

    let summary = normalize::summarize_repo_stats(&repos, Utc::now());
    let profile = json!({
        "username": user.login,
        "name": user.name,
        "bio": user.bio,
        "followers": user.followers,
        "public_repos": user.public_repos,
        "totalStars": summary.total_stars,
        "totalForks": summary.total_forks,
        "topLanguages": summary.top_languages,
        "reposAnalyzed": repos.len(),
        "recentActiveReposLast30Days": summary.recent_count,
    });

    info!("generating insight cards for {}", username);
    let reply = data
        .gemini
        .generate_content(&insight_prompt(&profile), INSIGHTS_TEMPERATURE)
        .await?;

    // The model sometimes wraps its JSON in markdown fences; strip them
    // before parsing, and fall back to the raw text when it still
    // doesn't parse.
    let cleaned = strip_code_fences(&reply);
    Ok(match serde_json::from_str::<Insights>(cleaned) {
        Ok(insights) => json!({ "ok": true, "profile": profile, "insights": insights }),
        Err(_) => json!({ "ok": true, "profile": profile, "rawAI": reply }),
    })
}

fn insight_prompt(profile: &Value) -> String {
    let data = serde_json::to_string_pretty(profile).unwrap_or_else(|_| profile.to_string());
    format!(
        r#"You are "Ripper Pro", an AI that converts GitHub profile data into three short,
professional insight cards tailored for engineering managers and recruiters.
Produce:
1) Strengths: short (1-2 sentences) - what the dev is strongest at technically.
2) Productivity Trend: short (1-2 sentences) - activity and consistency comment.
3) Recommendation: short action or suggestion for manager/recruiter.

Keep output as a JSON object:
{{
  "strengths": "text",
  "trend": "text",
  "recommendation": "text"
}}

Here is the input data:
{data}"#,
    )
}

fn strip_code_fences(reply: &str) -> &str {
    reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_fences_are_stripped() {
        let fenced = "```json\n{\"strengths\": \"s\", \"trend\": \"t\", \"recommendation\": \"r\"}\n```";
        let insights: Insights = serde_json::from_str(strip_code_fences(fenced)).unwrap();
        assert_eq!(insights.strengths, "s");
        assert_eq!(insights.recommendation, "r");
    }

    #[test]
    fn bare_json_passes_through_unchanged() {
        let bare = r#"{"strengths": "s", "trend": "t", "recommendation": "r"}"#;
        assert_eq!(strip_code_fences(bare), bare);
    }

    #[test]
    fn prompt_embeds_the_profile_data() {
        let profile = json!({ "username": "octocat", "totalStars": 42 });
        let prompt = insight_prompt(&profile);
        assert!(prompt.contains("octocat"));
        assert!(prompt.contains("Ripper Pro"));
        assert!(prompt.contains(r#""recommendation": "text""#));
    }
}
